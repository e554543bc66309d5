use anyhow::Result;
use mockito::{Matcher, Server};
use serde_json::json;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const USD: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

/// Runs the binary with a config file that does not exist unless a test
/// passes its own `-c`.
fn liquidtx(args: &[&str]) -> Result<Output> {
    let output = Command::new(env!("CARGO_BIN_EXE_liquidtx"))
        .args(args)
        .env_remove("ELEMENTS_URL")
        .env_remove("ELEMENTS_PASSPHRASE")
        .env("RUST_LOG", "error")
        .output()?;
    Ok(output)
}

fn mock_rpc(server: &mut Server, method: &str, result: serde_json::Value) -> mockito::Mock {
    server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({ "method": method })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "result": result, "error": null, "id": "liquidtx" }).to_string())
        .create()
}

fn write_config(dir: &Path) -> Result<String> {
    let path = dir.join("setting.json");
    std::fs::write(
        &path,
        json!({ "assets": { "USD": USD } }).to_string(),
    )?;
    Ok(path.display().to_string())
}

#[test]
fn test_unknown_command_exits_cleanly() -> Result<()> {
    let output = liquidtx(&["frobnicate"])?;

    assert!(output.status.success());
    assert!(String::from_utf8(output.stdout)?.contains("Unknown command: frobnicate"));
    Ok(())
}

#[test]
fn test_unreachable_node_exit_code() -> Result<()> {
    let output = liquidtx(&[
        "-e",
        "http://127.0.0.1:1/",
        "-c",
        "/nonexistent/setting.json",
        "getbalance",
    ])?;

    assert_eq!(output.status.code(), Some(4));
    Ok(())
}

#[test]
fn test_old_node_is_rejected() -> Result<()> {
    let mut server = Server::new();
    let _version = mock_rpc(&mut server, "getnetworkinfo", json!({ "version": 160000 }));

    let output = liquidtx(&["-e", &server.url(), "lock"])?;

    assert_eq!(output.status.code(), Some(5));
    Ok(())
}

#[test]
fn test_getnewaddress_writes_output_file() -> Result<()> {
    let dir = TempDir::new()?;
    let output_file = dir.path().join("address.txt");
    let mut server = Server::new();
    let _version = mock_rpc(&mut server, "getnetworkinfo", json!({ "version": 220100 }));
    let address = mock_rpc(&mut server, "getnewaddress", json!("ert1qgenerated"));

    let output = liquidtx(&[
        "-e",
        &server.url(),
        "getnewaddress",
        "-o",
        &output_file.display().to_string(),
    ])?;

    assert!(output.status.success());
    assert!(String::from_utf8(output.stdout)?.contains("address: ert1qgenerated"));
    assert_eq!(std::fs::read_to_string(&output_file)?, "ert1qgenerated");
    address.assert();
    Ok(())
}

#[test]
fn test_send_unknown_asset_never_sends() -> Result<()> {
    let dir = TempDir::new()?;
    let config = write_config(dir.path())?;
    let mut server = Server::new();
    let _version = mock_rpc(&mut server, "getnetworkinfo", json!({ "version": 220100 }));
    let send = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({ "method": "sendtoaddress" })))
        .expect(0)
        .create();

    let output = liquidtx(&[
        "-e",
        &server.url(),
        "-c",
        &config,
        "send",
        "--address",
        "ert1qdest",
        "--amount",
        "10",
        "-a",
        "EUR",
    ])?;

    assert_eq!(output.status.code(), Some(2));
    send.assert();
    Ok(())
}

#[test]
fn test_getbalance_formats_amounts() -> Result<()> {
    let dir = TempDir::new()?;
    let config = write_config(dir.path())?;
    let output_file = dir.path().join("balance.json");
    let mut server = Server::new();
    let _version = mock_rpc(&mut server, "getnetworkinfo", json!({ "version": 220100 }));
    let _balance = mock_rpc(
        &mut server,
        "getbalance",
        json!({ "bitcoin": 1.5, "USD": 0.00000001 }),
    );

    let output = liquidtx(&[
        "-e",
        &server.url(),
        "-c",
        &config,
        "getbalance",
        "-o",
        &output_file.display().to_string(),
    ])?;
    assert!(output.status.success());

    let balances: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output_file)?)?;
    assert_eq!(balances[0]["label"], json!("USD"));
    assert_eq!(balances[0]["amount"], json!(1));
    assert_eq!(balances[1]["label"], json!("bitcoin"));
    assert_eq!(balances[1]["amount"], json!("1.50000000"));
    Ok(())
}

fn listaddresses_with_log(server: &Server, rust_log: Option<&str>) -> Result<Output> {
    let mut command = Command::new(env!("CARGO_BIN_EXE_liquidtx"));
    command
        .args(["-e", &server.url(), "listaddresses"])
        .env_remove("ELEMENTS_URL")
        .env_remove("RUST_LOG");
    if let Some(filter) = rust_log {
        command.env("RUST_LOG", filter);
    }
    Ok(command.output()?)
}

#[test]
fn test_rust_log_level_is_honoured() -> Result<()> {
    let mut server = Server::new();
    let _version = mock_rpc(&mut server, "getnetworkinfo", json!({ "version": 220100 }));
    let _addresses = mock_rpc(
        &mut server,
        "listreceivedbyaddress",
        json!([{ "address": "ert1qfirst", "amount": 0 }]),
    );

    let quiet = listaddresses_with_log(&server, Some("error"))?;
    assert!(quiet.status.success());
    assert!(String::from_utf8(quiet.stdout)?.contains("ert1qfirst"));
    assert!(!String::from_utf8(quiet.stderr)?.contains("INFO"));

    let default = listaddresses_with_log(&server, None)?;
    assert!(default.status.success());
    assert!(String::from_utf8(default.stderr)?.contains("Found 1 addresses"));
    Ok(())
}

#[test]
fn test_usage_errors_and_help() -> Result<()> {
    let help = liquidtx(&["--help"])?;
    assert!(help.status.success());
    assert!(String::from_utf8(help.stdout)?.contains("Usage"));

    let missing = liquidtx(&["send", "--amount", "1"])?;
    assert_eq!(missing.status.code(), Some(2));
    assert!(String::from_utf8(missing.stderr)?.contains("--address"));
    Ok(())
}
