// test of the CLI round trip
use assert_cmd::Command;
use predicates::prelude::*;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

#[test]
fn mkdsk_writes_an_image() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let img = dir.path().join("test.osk");
    let mut cmd = Command::cargo_bin("oskit")?;
    cmd.arg("mkdsk")
        .arg("-d").arg(&img)
        .arg("-s").arg("128")
        .assert()
        .success()
        .stderr(predicate::str::contains("writing 16384 bytes"));
    assert_eq!(std::fs::metadata(&img)?.len(),128*128);
    Ok(())
}

#[test]
fn put_get_round_trip() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let img = dir.path().join("test.osk");
    Command::cargo_bin("oskit")?
        .arg("mkdsk").arg("-d").arg(&img)
        .assert().success();
    Command::cargo_bin("oskit")?
        .arg("mkdir").arg("-f").arg("/docs").arg("-d").arg(&img)
        .assert().success();
    Command::cargo_bin("oskit")?
        .arg("put").arg("-f").arg("/docs/hello").arg("-d").arg(&img)
        .write_stdin("hello world\n")
        .assert().success();
    Command::cargo_bin("oskit")?
        .arg("get").arg("-f").arg("/docs/hello").arg("-d").arg(&img)
        .assert().success()
        .stdout("hello world\n");
    Ok(())
}

#[test]
fn catalog_lists_entries() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let img = dir.path().join("test.osk");
    Command::cargo_bin("oskit")?
        .arg("mkdsk").arg("-d").arg(&img)
        .assert().success();
    Command::cargo_bin("oskit")?
        .arg("mkdir").arg("-f").arg("/docs").arg("-d").arg(&img)
        .assert().success();
    Command::cargo_bin("oskit")?
        .arg("put").arg("-f").arg("/readme").arg("-d").arg(&img)
        .write_stdin("x")
        .assert().success();
    Command::cargo_bin("oskit")?
        .arg("catalog").arg("-d").arg(&img)
        .assert().success()
        .stdout(predicate::str::contains("docs").and(predicate::str::contains("readme")));
    Ok(())
}

#[test]
fn delete_then_get_fails() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let img = dir.path().join("test.osk");
    Command::cargo_bin("oskit")?
        .arg("mkdsk").arg("-d").arg(&img)
        .assert().success();
    Command::cargo_bin("oskit")?
        .arg("put").arg("-f").arg("/gone").arg("-d").arg(&img)
        .write_stdin("bye")
        .assert().success();
    Command::cargo_bin("oskit")?
        .arg("delete").arg("-f").arg("/gone").arg("-d").arg(&img)
        .assert().success();
    Command::cargo_bin("oskit")?
        .arg("get").arg("-f").arg("/gone").arg("-d").arg(&img)
        .assert().failure();
    Ok(())
}

#[test]
fn stat_reports_free_sectors() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let img = dir.path().join("test.osk");
    Command::cargo_bin("oskit")?
        .arg("mkdsk").arg("-d").arg(&img).arg("-s").arg("128")
        .assert().success();
    Command::cargo_bin("oskit")?
        .arg("stat").arg("-d").arg(&img)
        .assert().success()
        .stdout(predicate::str::contains("\"free_sectors\":114"));
    Ok(())
}

#[test]
fn bad_sector_count_is_refused() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let img = dir.path().join("test.osk");
    Command::cargo_bin("oskit")?
        .arg("mkdsk").arg("-d").arg(&img).arg("-s").arg("4")
        .assert().failure();
    Ok(())
}
