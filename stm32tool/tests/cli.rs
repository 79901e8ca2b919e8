use std::{
    env,
    ffi::OsString,
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use zip::write::FileOptions;

const DEVICE: &str = "Drivers/CMSIS/Device/ST/STM32F1xx";
const HAL: &str = "Drivers/STM32F1xx_HAL_Driver";

struct Command {
    bin: PathBuf,
    args: Vec<OsString>,
    dir: Option<PathBuf>,
    store: Option<PathBuf>,
}

// Adapted from
// https://github.com/rust-lang/cargo/blob/485670b3983b52289a2f353d589c57fae2f60f82/tests/testsuite/support/mod.rs#L507
fn target_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .map(|mut path| {
            path.pop();
            if path.ends_with("deps") {
                path.pop();
            }
            path
        })
        .unwrap()
}

impl Command {
    fn cargo_bin(name: &str) -> Command {
        let bin = env::var_os(format!("CARGO_BIN_EXE_{name}"))
            .map(|p| p.into())
            .unwrap_or_else(|| target_dir().join(format!("{name}{}", env::consts::EXE_SUFFIX)));

        Command {
            bin,
            args: Vec::new(),
            dir: None,
            store: None,
        }
    }

    fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Runs in `dir` with the store below it, isolated from the user's home.
    fn sandbox(mut self, dir: &Path) -> Self {
        self.dir = Some(dir.to_path_buf());
        self.store = Some(dir.join("store"));
        self
    }

    fn run(self) -> CommandResult {
        let mut command = std::process::Command::new(self.bin);
        command.args(&self.args).env_remove("RUST_LOG");
        if let Some(dir) = &self.dir {
            command.current_dir(dir).env("HOME", dir);
        }
        if let Some(store) = &self.store {
            command.env("STM32TOOL_STORE_DIR", store);
        }

        let output = command.output().expect("failed to execute command");

        CommandResult {
            status: output.status,
            stdout: String::from_utf8(output.stdout).expect("stdout is not valid UTF-8"),
            stderr: String::from_utf8(output.stderr).expect("stderr is not valid UTF-8"),
        }
    }
}

struct CommandResult {
    status: std::process::ExitStatus,
    stdout: String,
    stderr: String,
}

/// Writes an STM32CubeF1 package with the files project creation relies on.
fn vendor_package(dir: &Path) -> PathBuf {
    let top = "STM32Cube_FW_F1_V1.8.0";
    let files = [
        (
            "package.xml".to_string(),
            "<?xml version=\"1.0\"?>\n<Package>\n  <PackDescription Release=\"FW.F1.1.8.0\"/>\n</Package>\n",
        ),
        ("Drivers/CMSIS/Include/core_cm3.h".to_string(), "/* core */"),
        (format!("{DEVICE}/Include/stm32f1xx.h"), "/* family */"),
        (format!("{DEVICE}/Include/stm32f103x6.h"), "/* f103x6 */"),
        (format!("{DEVICE}/Include/stm32f103xb.h"), "/* f103xb */"),
        (format!("{DEVICE}/Include/system_stm32f1xx.h"), "/* system */"),
        (format!("{DEVICE}/Source/Templates/system_stm32f1xx.c"), "/* system */"),
        (format!("{DEVICE}/Source/Templates/gcc/startup_stm32f103x6.s"), "@ f103x6"),
        (format!("{DEVICE}/Source/Templates/gcc/startup_stm32f103xb.s"), "@ f103xb"),
        (format!("{HAL}/Inc/stm32f1xx_hal.h"), "/* hal */"),
        (format!("{HAL}/Inc/stm32f1xx_hal_conf_template.h"), "/* conf */"),
        (format!("{HAL}/Src/stm32f1xx_hal.c"), "/* hal */"),
        (format!("{HAL}/Src/stm32f1xx_hal_msp_template.c"), "/* msp */"),
    ];

    let path = dir.join("en.stm32cubef1.zip");
    let mut zip = zip::ZipWriter::new(fs::File::create(&path).unwrap());
    for (name, content) in files {
        zip.start_file(format!("{top}/{name}"), FileOptions::<()>::default())
            .unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();

    path
}

#[test]
fn new_requires_an_mcu() {
    let temp = tempfile::TempDir::new().unwrap();

    let result = Command::cargo_bin("stm32tool")
        .arg("new")
        .arg("bluepill")
        .sandbox(temp.path())
        .run();

    assert!(!result.status.success());
    assert!(result
        .stderr
        .contains("the following required arguments were not provided:"));
    assert!(!temp.path().join("bluepill").exists());
}

#[test]
fn acquire_missing_package() {
    let temp = tempfile::TempDir::new().unwrap();

    let result = Command::cargo_bin("stm32tool")
        .arg("acquire")
        .arg("en.stm32cubef4.zip")
        .sandbox(temp.path())
        .run();

    assert!(!result.status.success());
    assert!(result.stderr.contains("[ERROR]"));
    assert!(result.stderr.contains("does not exist"));
}

#[test]
fn info_of_a_missing_project() {
    let temp = tempfile::TempDir::new().unwrap();

    let result = Command::cargo_bin("stm32tool")
        .arg("info")
        .arg("nothing-here")
        .sandbox(temp.path())
        .run();

    assert!(!result.status.success());
    assert!(result.stderr.contains("does not exist"));
}

#[test]
fn acquire_create_and_inspect_a_project() {
    let temp = tempfile::TempDir::new().unwrap();
    let package = vendor_package(temp.path());

    let acquire = Command::cargo_bin("stm32tool")
        .arg("acquire")
        .arg(&package)
        .sandbox(temp.path())
        .run();
    assert!(acquire.status.success(), "{}", acquire.stderr);
    assert!(acquire.stdout.contains("Installed the stm32f1 template, version 1.8.0"));
    assert!(temp.path().join("store/templates/stm32f1.json").is_file());
    assert!(temp.path().join("store/templates/stm32f1-1.8.0.zip").is_file());

    let again = Command::cargo_bin("stm32tool")
        .arg("acquire")
        .arg(&package)
        .sandbox(temp.path())
        .run();
    assert!(again.status.success(), "{}", again.stderr);
    assert!(again.stdout.contains("already up to date"));

    let new = Command::cargo_bin("stm32tool")
        .arg("new")
        .arg("bluepill")
        .arg("-m")
        .arg("stm32f103c8")
        .arg("-r")
        .arg("20")
        .arg("--skip-build")
        .sandbox(temp.path())
        .run();
    assert!(new.status.success(), "{}", new.stderr);
    assert!(new.stderr.contains("[WARNING]"));

    let project = temp.path().join("bluepill");
    let config = fs::read_to_string(project.join("config.mk")).unwrap();
    assert!(config.contains("MCU = -DSTM32F103xB\n"));
    assert!(config.contains("STARTUP = system/startup_stm32f103xb.s\n"));
    assert!(project.join("system/startup_stm32f103xb.s").is_file());
    assert!(!project.join("system/startup_stm32f103x6.s").exists());
    assert!(project.join("src/stm32f1xx_hal_conf.h").is_file());
    assert_eq!(
        fs::read_to_string(project.join("ldscripts/mem.ld")).unwrap(),
        "MEMORY\n{\n  FLASH (rx) : ORIGIN = 0x08000000, LENGTH = 64K\n  RAM (xrw) : ORIGIN = 0x20000000, LENGTH = 20K\n}\n"
    );

    let info = Command::cargo_bin("stm32tool")
        .arg("info")
        .arg("bluepill")
        .sandbox(temp.path())
        .run();
    assert!(info.status.success(), "{}", info.stderr);
    assert!(info.stdout.contains("\"STM32F103C8\""));
    assert!(info.stdout.contains("FLASH=64kB, RAM=20kB"));
    assert!(info.stdout.contains("[#files]"));

    let existing = Command::cargo_bin("stm32tool")
        .arg("new")
        .arg("bluepill")
        .arg("-m")
        .arg("STM32F103C8")
        .arg("-r")
        .arg("20")
        .arg("--skip-build")
        .sandbox(temp.path())
        .run();
    assert!(!existing.status.success());
    assert!(existing.stderr.contains("already exists"));
    assert!(project.join("mcu.json").is_file());
}
