//! End-to-end tests for the cart-cli binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn data_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("cart.toml"),
        "[cart]\nkey = \"example.com\"\n\n[revalidation]\ndebounce_ms = 10\n",
    )
    .unwrap();
    dir
}

fn cart_cli(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cart-cli").unwrap();
    cmd.arg("--data-dir").arg(dir.path());
    cmd
}

#[test]
fn show_empty_cart() {
    let dir = data_dir();
    cart_cli(&dir)
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("cart example.com (valid)"))
        .stdout(predicate::str::contains("(empty)"));
}

#[test]
fn add_item_persists_between_runs() {
    let dir = data_dir();
    cart_cli(&dir)
        .args(["add", "plan-personal", "1009"])
        .assert()
        .success()
        .stdout(predicate::str::contains("WordPress.com Personal"))
        .stdout(predicate::str::contains("48.00 USD"));

    assert!(dir.path().join("carts").join("cart-example.com.json").exists());

    cart_cli(&dir)
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("WordPress.com Personal"));
}

#[test]
fn coupon_applied_and_rejected() {
    let dir = data_dir();
    cart_cli(&dir).args(["add", "plan-premium", "1003"]).assert().success();

    cart_cli(&dir)
        .args(["coupon", "SAVE10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Coupon SAVE10 applied."))
        .stdout(predicate::str::contains("86.40 USD"));

    cart_cli(&dir)
        .args(["coupon", "BOGUS"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Coupon BOGUS rejected"));
}

#[test]
fn remove_coupon_clears_discount() {
    let dir = data_dir();
    cart_cli(&dir).args(["add", "plan-premium", "1003"]).assert().success();
    cart_cli(&dir).args(["coupon", "SAVE10"]).assert().success();

    cart_cli(&dir)
        .arg("remove-coupon")
        .assert()
        .success()
        .stdout(predicate::str::contains("Coupon:").not())
        .stdout(predicate::str::contains("Total:    96.00 USD"));
}

#[test]
fn key_flag_selects_another_cart() {
    let dir = data_dir();
    cart_cli(&dir).args(["add", "domain_reg", "6", "--meta", "example.org"]).assert().success();

    cart_cli(&dir)
        .args(["--key", "other-site", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cart other-site"))
        .stdout(predicate::str::contains("(empty)"));
}

#[test]
fn location_requires_a_field() {
    let dir = data_dir();
    cart_cli(&dir)
        .arg("location")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--country"));
}

#[test]
fn location_adds_tax() {
    let dir = data_dir();
    cart_cli(&dir).args(["add", "plan-premium", "1003"]).assert().success();

    cart_cli(&dir)
        .args(["location", "--country", "US", "--postal-code", "94110"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tax:      7.92 USD"))
        .stdout(predicate::str::contains("Location: US 94110"));
}
