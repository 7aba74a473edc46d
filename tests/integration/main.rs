//! Integration tests for texbundle

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;

const DIGEST: &str = "2c26b46b68ffc68ff99b453c1d30413413422d706483bfa0f98a5e886266e7ae";

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

mod cli_tests {
    use super::*;
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn texbundle() -> Command {
        let mut cmd = cargo_bin_cmd!("texbundle");
        cmd.env_remove("TEXBUNDLE_CONFIG")
            .env_remove("TEXBUNDLE_CACHE_DIR");
        cmd
    }

    fn write_config(dir: &Path, base_url: &str) -> std::path::PathBuf {
        let path = dir.join("config.toml");
        fs::write(
            &path,
            format!(
                r#"
[bundle]
url = "{base_url}/bundle.tar"
index_url = "{base_url}/bundle.tar.index.gz"
digest = "{DIGEST}"

[network]
attempts = 2
retry_delay_ms = 0
timeout_secs = 10
"#
            ),
        )
        .unwrap();
        path
    }

    #[test]
    fn help_displays() {
        texbundle()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("TeX resource bundle"));
    }

    #[test]
    fn version_displays() {
        texbundle()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("texbundle"));
    }

    #[test]
    fn status_json_on_empty_cache() {
        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path(), "http://127.0.0.1:9");
        let cache = temp.path().join("cache");

        texbundle()
            .arg("--config")
            .arg(&config)
            .arg("--cache-dir")
            .arg(&cache)
            .args(["status", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"entries\": 0"))
            .stdout(predicate::str::contains(DIGEST));
    }

    #[test]
    fn status_text_without_config_file() {
        let temp = TempDir::new().unwrap();

        texbundle()
            .arg("--config")
            .arg(temp.path().join("missing.toml"))
            .arg("--cache-dir")
            .arg(temp.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("bundle.digest is not set"));
    }

    #[test]
    fn index_requires_configured_bundle() {
        let temp = TempDir::new().unwrap();

        texbundle()
            .arg("--config")
            .arg(temp.path().join("missing.toml"))
            .arg("--cache-dir")
            .arg(temp.path())
            .arg("index")
            .assert()
            .failure()
            .stderr(predicate::str::contains("bundle.url is not set"));
    }

    #[test]
    fn seed_requires_names() {
        texbundle()
            .arg("seed")
            .assert()
            .failure()
            .stderr(predicate::str::contains("<NAMES>"));
    }

    #[test]
    fn index_fetch_and_seed_against_server() {
        let mut server = mockito::Server::new();
        let data = b"% plain\n\\relax\n% article\n";
        let index = "plain.tex 0 8\narticle.cls 15 10\nrelax.tex 8 7\n";

        let index_mock = server
            .mock("GET", "/bundle.tar.index.gz")
            .with_status(200)
            .with_body(gzip(index.as_bytes()))
            .expect(1)
            .create();
        let range_mock = server
            .mock("GET", "/bundle.tar")
            .match_header("range", "bytes=0-7")
            .with_status(206)
            .with_body(&data[0..8])
            .expect(1)
            .create();
        let seed_mock = server
            .mock("GET", "/bundle.tar")
            .match_header("range", "bytes=8-14")
            .with_status(206)
            .with_body(&data[8..15])
            .expect(1)
            .create();

        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path(), &server.url());
        let cache = temp.path().join("cache");
        let run = |args: &[&str]| {
            let mut cmd = texbundle();
            cmd.arg("--config")
                .arg(&config)
                .arg("--cache-dir")
                .arg(&cache)
                .args(args);
            cmd.assert()
        };

        run(&["index"])
            .success()
            .stdout(predicate::str::contains("3 entries"));

        run(&["fetch", "plain.tex"])
            .success()
            .stdout("% plain\n");

        // Served from cache: the range mock expects exactly one hit.
        let out = temp.path().join("plain.tex");
        run(&["fetch", "plain.tex", "-o", out.to_str().unwrap()]).success();
        assert_eq!(fs::read(&out).unwrap(), b"% plain\n");

        run(&["fetch", "nope.sty"])
            .failure()
            .stderr(predicate::str::contains("not present in bundle index"));

        run(&["seed", "relax.tex", "plain.tex", "ghost.tex", "-j", "2"])
            .success()
            .stdout(predicate::str::contains("Prefetched 2 of 3 resources (1 failed)"));

        run(&["status", "--format", "json"])
            .success()
            .stdout(predicate::str::contains("\"entries\": 2"))
            .stdout(predicate::str::contains("\"index_cached\": true"));

        index_mock.assert();
        range_mock.assert();
        seed_mock.assert();
    }
}

mod wire_tests {
    use super::*;
    use tempfile::TempDir;
    use texbundle::bundle::BundleStore;
    use texbundle::config::Config;
    use texbundle::host::NativeHost;
    use texbundle::{BundleError, Digest, Host, IndexEntry};

    fn config(base_url: &str) -> Config {
        let mut config = Config::default();
        config.bundle.url = format!("{}/bundle.tar", base_url);
        config.bundle.index_url = format!("{}/bundle.tar.index.gz", base_url);
        config.bundle.digest = Some(Digest::parse(DIGEST).unwrap());
        config.network.attempts = 3;
        config.network.retry_delay_ms = 0;
        config.network.timeout_secs = 10;
        config
    }

    #[test]
    fn range_request_uses_inclusive_header() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/bundle.tar")
            .match_header("range", "bytes=10-14")
            .with_status(206)
            .with_body("hello")
            .expect(1)
            .create();
        let temp = TempDir::new().unwrap();
        let host = NativeHost::new(&config(&server.url()), temp.path()).unwrap();

        let bytes = host.fetch_range("hello.tex", IndexEntry::new(10, 5)).unwrap();

        assert_eq!(bytes, b"hello");
        mock.assert();
    }

    #[test]
    fn ignored_range_header_is_sliced() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/bundle.tar")
            .with_status(200)
            .with_body("0123456789")
            .create();
        let temp = TempDir::new().unwrap();
        let host = NativeHost::new(&config(&server.url()), temp.path()).unwrap();

        assert_eq!(host.fetch_range("x", IndexEntry::new(2, 3)).unwrap(), b"234");
        mock.assert();
    }

    #[test]
    fn server_error_exhausts_attempts() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/bundle.tar")
            .with_status(500)
            .expect(3)
            .create();
        let temp = TempDir::new().unwrap();
        let host = NativeHost::new(&config(&server.url()), temp.path()).unwrap();

        let err = host.fetch_range("x", IndexEntry::new(0, 4)).unwrap_err();

        assert!(matches!(err, BundleError::Http { status: 500, .. }));
        mock.assert();
    }

    #[test]
    fn not_found_is_an_http_error() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/bundle.tar")
            .with_status(404)
            .expect(3)
            .create();
        let temp = TempDir::new().unwrap();
        let host = NativeHost::new(&config(&server.url()), temp.path()).unwrap();

        let err = host.fetch_range("x", IndexEntry::new(0, 4)).unwrap_err();
        assert_eq!(err.status(), Some(404));
        mock.assert();
    }

    #[test]
    fn index_is_gunzipped_and_cached() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/bundle.tar.index.gz")
            .with_status(200)
            .with_body(gzip(b"a.tex 0 4\nb.tex 4 4\n"))
            .expect(1)
            .create();
        let temp = TempDir::new().unwrap();
        let config = config(&server.url());

        for _ in 0..2 {
            let host = NativeHost::new(&config, temp.path()).unwrap();
            let mut store = BundleStore::new(host, config.bundle.digest.clone());
            assert_eq!(store.load_index().unwrap(), 2);
            assert_eq!(store.entry("b.tex").unwrap(), IndexEntry::new(4, 4));
        }

        mock.assert();
    }

    #[test]
    fn redirect_target_is_remembered() {
        let mut server = mockito::Server::new();
        let target = format!("{}/cdn/bundle-1.tar", server.url());
        let redirect = server
            .mock("GET", "/bundle.tar")
            .with_status(302)
            .with_header("location", &target)
            .expect(1)
            .create();
        let cdn = server
            .mock("GET", "/cdn/bundle-1.tar")
            .with_status(206)
            .with_body("abcd")
            .expect(2)
            .create();
        let temp = TempDir::new().unwrap();
        let config = config(&server.url());

        let first = NativeHost::new(&config, temp.path()).unwrap();
        assert_eq!(first.fetch_range("a", IndexEntry::new(0, 4)).unwrap(), b"abcd");
        assert_eq!(first.data_url(), target);
        drop(first);

        let second = NativeHost::new(&config, temp.path()).unwrap();
        assert_eq!(second.data_url(), target);
        assert_eq!(second.fetch_range("a", IndexEntry::new(0, 4)).unwrap(), b"abcd");

        redirect.assert();
        cdn.assert();
    }

    #[test]
    fn parallel_seed_against_server() {
        let mut server = mockito::Server::new();
        let mocks: Vec<_> = (0..20)
            .map(|i| {
                let start = i * 4;
                server
                    .mock("GET", "/bundle.tar")
                    .match_header("range", format!("bytes={}-{}", start, start + 3).as_str())
                    .with_status(206)
                    .with_body(format!("{:04}", i))
                    .expect(1)
                    .create()
            })
            .collect();
        let temp = TempDir::new().unwrap();
        let config = config(&server.url());
        let host = NativeHost::new(&config, temp.path()).unwrap();

        let items: Vec<_> = (0..20)
            .map(|i| texbundle::SeedItem::new(format!("f{}.tex", i), IndexEntry::new(i * 4, 4)))
            .collect();
        let result = host.batch_seed(&items, 8);

        assert_eq!(result.fetched, 20);
        assert_eq!(result.failed, 0);
        assert_eq!(host.cache_open("f7.tex").unwrap(), b"0007");
        for mock in mocks {
            mock.assert();
        }
    }
}
