use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use sha2::{Digest, Sha256};
use tempfile::TempDir;

const MDIEW: &str = r#"cask "mdiew" do
  arch arm: "aarch64", intel: "x86_64"
  version "0.1.1"
  sha256 arm:   "PLACEHOLDER",
         intel: "PLACEHOLDER"

  url "https://github.com/SeungheonOh/mdiew/releases/download/v#{version}/mdiew-#{arch}-apple-darwin.app.zip"
  name "mdiew"
  desc "A fast, native macOS markdown viewer"
  homepage "https://github.com/SeungheonOh/mdiew"

  livecheck do
    url :url
    strategy :github_latest
  end

  depends_on macos: ">= :monterey"

  app "mdiew.app"
end
"#;

/// Temporary cask home with a catalog directory.
struct TestContext {
    temp_dir: TempDir,
    home: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let home = temp_dir.path().join(".cask");
        std::fs::create_dir_all(home.join("Casks")).expect("failed to create catalog");
        Self { temp_dir, home }
    }

    fn add_cask(&self, file: &str, content: &str) -> PathBuf {
        let path = self.home.join("Casks").join(file);
        std::fs::write(&path, content).expect("failed to write cask");
        path
    }

    fn appdir(&self) -> PathBuf {
        self.temp_dir.path().join("Applications")
    }

    fn cask(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_cask"))
            .args(args)
            .env("HOME", self.temp_dir.path())
            .env("CASK_HOME", &self.home)
            .env("CASK_APPDIR", self.appdir())
            .env("CASK_ARCH", "arm")
            .env("CASK_MACOS", "14.4")
            .env_remove("CASK_CATALOG")
            .env_remove("RUST_LOG")
            .output()
            .expect("failed to run cask")
    }
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let out = ctx.cask(&["--help"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("Usage:"));
}

#[test]
fn test_resolve_picks_host_arch() {
    let ctx = TestContext::new();
    ctx.add_cask("mdiew.rb", MDIEW);

    let out = ctx.cask(&["resolve", "mdiew"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stdout(&out).contains(
        "https://github.com/SeungheonOh/mdiew/releases/download/v0.1.1/mdiew-aarch64-apple-darwin.app.zip"
    ));
    assert!(stderr(&out).contains("placeholder"));
    assert!(stdout(&out).contains("14.4 (sonoma)"));

    let out = ctx.cask(&["resolve", "mdiew", "--arch", "intel", "--json"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["arch"], "intel");
    assert_eq!(json["app"], "mdiew.app");
    assert!(json["url"].as_str().unwrap().ends_with("mdiew-x86_64-apple-darwin.app.zip"));
}

#[test]
fn test_resolve_rejects_old_macos() {
    let ctx = TestContext::new();
    let path = ctx.add_cask("mdiew.rb", MDIEW);

    let out = ctx.cask(&["resolve", path.to_str().unwrap(), "--macos", "big_sur"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("macOS"), "{}", stderr(&out));
}

#[test]
fn test_resolve_strict_refuses_placeholder() {
    let ctx = TestContext::new();
    ctx.add_cask("mdiew.rb", MDIEW);

    let out = ctx.cask(&["resolve", "mdiew", "--strict"]);
    assert!(!out.status.success());
}

#[test]
fn test_info_names_minimum_release() {
    let ctx = TestContext::new();
    ctx.add_cask("mdiew.rb", MDIEW);

    let out = ctx.cask(&["info", "mdiew"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stdout(&out).contains(">= :monterey (monterey or later)"));
}

#[test]
fn test_unknown_cask() {
    let ctx = TestContext::new();
    let out = ctx.cask(&["info", "nope"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("No cask named 'nope'"));
}

#[test]
fn test_list_and_search() {
    let ctx = TestContext::new();
    ctx.add_cask("mdiew.rb", MDIEW);

    let out = ctx.cask(&["list"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stdout(&out).contains("mdiew"));

    let out = ctx.cask(&["search", "markdown"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("mdiew"));

    let out = ctx.cask(&["search", "zzzz"]);
    assert!(stdout(&out).contains("No casks found"));
}

#[test]
fn test_audit_strict_fails_on_placeholder() {
    let ctx = TestContext::new();
    ctx.add_cask("mdiew.rb", MDIEW);

    let out = ctx.cask(&["audit"]);
    assert!(out.status.success(), "{}", stderr(&out));

    let out = ctx.cask(&["audit", "--strict"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("audit failed"));
}

#[test]
fn test_convert_both_ways() {
    let ctx = TestContext::new();
    let rb = ctx.add_cask("mdiew.rb", MDIEW);
    let toml_path = ctx.temp_dir.path().join("mdiew.toml");

    let out = ctx.cask(&[
        "convert",
        rb.to_str().unwrap(),
        "--output",
        toml_path.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "{}", stderr(&out));
    let toml = std::fs::read_to_string(&toml_path).unwrap();
    assert!(toml.contains("[cask]"));

    let out = ctx.cask(&["convert", toml_path.to_str().unwrap()]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stdout(&out).starts_with("cask \"mdiew\" do"));
}

#[test]
fn test_hash_command() {
    let ctx = TestContext::new();
    let file = ctx.temp_dir.path().join("hello.txt");
    std::fs::write(&file, "hello world").unwrap();

    let out = ctx.cask(&["hash", file.to_str().unwrap()]);
    assert!(out.status.success());
    assert!(
        stdout(&out)
            .starts_with("b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9")
    );
}

fn bundle_zip() -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buf);
        let opts = zip::write::SimpleFileOptions::default();
        zip.start_file("Demo.app/Contents/Info.plist", opts).unwrap();
        zip.write_all(b"<plist/>").unwrap();
        zip.finish().unwrap();
    }
    buf.into_inner()
}

fn demo_toml(url: &str, sha: &str) -> String {
    format!(
        r#"sha256 = "{sha}"

[cask]
name = "demo"
version = "2.0"
url = "{url}/demo-{{{{version}}}}.zip"
app = "Demo.app"
"#
    )
}

fn installed(appdir: &Path) -> bool {
    appdir.join("Demo.app/Contents/Info.plist").exists()
}

#[test]
fn test_install_end_to_end() {
    let body = bundle_zip();
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/demo-2.0.zip")
        .with_status(200)
        .with_body(&body)
        .expect(1)
        .create();

    let ctx = TestContext::new();
    ctx.add_cask(
        "demo.toml",
        &demo_toml(&server.url(), &hex::encode(Sha256::digest(&body))),
    );

    let out = ctx.cask(&["install", "demo", "--dry-run"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(!installed(&ctx.appdir()));

    let out = ctx.cask(&["install", "demo"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(installed(&ctx.appdir()));
    mock.assert();

    // Already there: refused without --force.
    let out = ctx.cask(&["install", "demo"]);
    assert!(!out.status.success());
}

#[test]
fn test_install_checksum_mismatch_fails() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/demo-2.0.zip")
        .with_status(200)
        .with_body(bundle_zip())
        .create();

    let ctx = TestContext::new();
    let wrong = hex::encode(Sha256::digest(b"tampered"));
    ctx.add_cask("demo.toml", &demo_toml(&server.url(), &wrong));

    let out = ctx.cask(&["install", "demo"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("Checksum mismatch"), "{}", stderr(&out));
    assert!(!installed(&ctx.appdir()));
}

#[test]
fn test_install_same_cask_twice_downloads_once() {
    let body = bundle_zip();
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/demo-2.0.zip")
        .with_status(200)
        .with_body(&body)
        .expect(1)
        .create();

    let ctx = TestContext::new();
    let path = ctx.add_cask(
        "demo.toml",
        &demo_toml(&server.url(), &hex::encode(Sha256::digest(&body))),
    );

    let out = ctx.cask(&["install", "demo", "demo", path.to_str().unwrap()]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(installed(&ctx.appdir()));
    mock.assert();
}
