use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;

fn write_dataset(name: &str) -> PathBuf {
    let dir = PathBuf::from("target/tmp/tests").join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("train.txt"),
        "einstein\twon\tnobel\ncurie\twon\tnobel\neinstein\tborn_in\tgermany\ncurie\tborn_in\tpoland\nbohr\twon\tnobel\n",
    )
    .unwrap();
    fs::write(dir.join("valid.txt"), "bohr\tborn_in\tdenmark\n").unwrap();
    fs::write(dir.join("test.txt"), "curie\twon\tnobel_chem\n").unwrap();
    dir
}

#[test]
fn test_cli_stats() -> Result<(), Box<dyn std::error::Error>> {
    let dir = write_dataset("stats");

    let mut cmd = Command::cargo_bin("kyanite")?;
    cmd.arg("stats").arg(&dir);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Entities:       8"))
        .stdout(predicate::str::contains("Relations:      2"))
        .stdout(predicate::str::contains("Train triples:  5"))
        .stdout(predicate::str::contains("Test triples:   1"))
        .stdout(predicate::str::contains("Train pairs:    5"));

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn test_cli_train_reports_metrics() -> Result<(), Box<dyn std::error::Error>> {
    let dir = write_dataset("train_quick");

    let mut cmd = Command::cargo_bin("kyanite")?;
    cmd.arg("train")
        .arg(&dir)
        .arg("--epochs")
        .arg("2")
        .arg("--entity-dim")
        .arg("8")
        .arg("--relation-dim")
        .arg("4")
        .arg("--batch-size")
        .arg("4")
        .arg("--lr")
        .arg("0.01");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Training TuckER"))
        .stdout(predicate::str::contains("MRR:"))
        .stderr(predicate::str::contains("Epoch 0"))
        .stderr(predicate::str::contains("Epoch 1"));

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn test_cli_train_json_output() -> Result<(), Box<dyn std::error::Error>> {
    let dir = write_dataset("train_json");

    let mut cmd = Command::cargo_bin("kyanite")?;
    cmd.arg("train")
        .arg(&dir)
        .arg("--epochs")
        .arg("1")
        .arg("--entity-dim")
        .arg("8")
        .arg("--relation-dim")
        .arg("4")
        .arg("--json");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"mrr\""))
        .stdout(predicate::str::contains("\"hits_at_k\""));

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn test_cli_train_rejects_invalid_config() -> Result<(), Box<dyn std::error::Error>> {
    let dir = write_dataset("train_invalid");

    let mut cmd = Command::cargo_bin("kyanite")?;
    cmd.arg("train").arg(&dir).arg("--epochs").arg("0");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("config error"));

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn test_cli_train_rejects_unknown_device() -> Result<(), Box<dyn std::error::Error>> {
    let dir = write_dataset("train_bad_device");

    let mut cmd = Command::cargo_bin("kyanite")?;
    cmd.arg("train").arg(&dir).arg("--device").arg("abacus");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid --device"));

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn test_cli_stats_missing_dataset() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("kyanite")?;
    cmd.arg("stats").arg("target/tmp/tests/does_not_exist");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load dataset"));
    Ok(())
}
