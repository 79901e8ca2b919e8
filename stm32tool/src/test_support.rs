//! Synthetic STM32Cube distributions for tests.

use std::fs;
use std::path::{Path, PathBuf};

use crate::fs_tree;
use crate::interrupt::CancelFlag;

/// A minimal vendor tree with the directories the normalizer relies on.
pub struct VendorTree {
    pub top: String,
    pub release: String,
    pub files: Vec<(String, String)>,
}

impl VendorTree {
    /// An STM32F1 distribution with three device models.
    pub fn f1(version: &str) -> Self {
        let device = "Drivers/CMSIS/Device/ST/STM32F1xx";
        let hal = "Drivers/STM32F1xx_HAL_Driver";
        let files = vec![
            ("Drivers/CMSIS/Include/core_cm3.h".to_string(), "/* core */"),
            ("Drivers/CMSIS/Include/cmsis_gcc.h".to_string(), "/* gcc */"),
            (format!("{device}/Include/stm32f1xx.h"), "/* family */"),
            (format!("{device}/Include/stm32f100xb.h"), "/* f100xb */"),
            (format!("{device}/Include/stm32f103x6.h"), "/* f103x6 */"),
            (format!("{device}/Include/stm32f103xb.h"), "/* f103xb */"),
            (format!("{device}/Include/system_stm32f1xx.h"), "/* system */"),
            (format!("{device}/Source/Templates/system_stm32f1xx.c"), "/* system */"),
            (format!("{device}/Source/Templates/gcc/startup_stm32f100xb.s"), "@ f100xb"),
            (format!("{device}/Source/Templates/gcc/startup_stm32f103x6.s"), "@ f103x6"),
            (format!("{device}/Source/Templates/gcc/startup_stm32f103xb.s"), "@ f103xb"),
            (format!("{device}/Source/Templates/gcc/linker/STM32F103XB_FLASH.ld"), "/* ld */"),
            (format!("{device}/Source/Templates/arm/startup_stm32f103xb.s"), "; keil"),
            (format!("{hal}/Inc/stm32f1xx_hal.h"), "/* hal */"),
            (format!("{hal}/Inc/stm32f1xx_hal_conf_template.h"), "/* conf */"),
            (format!("{hal}/Src/stm32f1xx_hal.c"), "/* hal */"),
            (format!("{hal}/Src/stm32f1xx_hal_msp_template.c"), "/* msp */"),
            ("Drivers/BSP/README.md".to_string(), "boards"),
        ];

        Self {
            top: format!("STM32Cube_FW_F1_V{version}"),
            release: format!("FW.F1.{version}"),
            files: files
                .into_iter()
                .map(|(path, content)| (path, content.to_string()))
                .collect(),
        }
    }

    /// Drops every file below `prefix`.
    pub fn without(mut self, prefix: &str) -> Self {
        self.files.retain(|(path, _)| !path.starts_with(prefix));
        self
    }

    /// Writes the tree below `dir` and returns its top level directory.
    pub fn write(&self, dir: &Path) -> PathBuf {
        let root = dir.join(&self.top);
        write_file(
            &root.join("package.xml"),
            &format!(
                "<?xml version=\"1.0\"?>\n<Package>\n  <PackDescription Release=\"{}\"/>\n</Package>\n",
                self.release
            ),
        );
        for (path, content) in &self.files {
            write_file(&root.join(path), content);
        }
        root
    }
}

pub fn write_file(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Zips `tree` the way ST ships it, with the top level directory inside.
pub fn vendor_archive(dir: &Path, tree: &VendorTree) -> PathBuf {
    let staging = tempfile::tempdir().unwrap();
    tree.write(staging.path());

    let archive = dir.join("en.stm32cubef1.zip");
    let file = fs::File::create(&archive).unwrap();
    fs_tree::zip_dir_content(staging.path(), file, &CancelFlag::new()).unwrap();
    archive
}

/// Writes the files every new project gets.
pub fn write_common_files(common: &Path) {
    write_file(
        &common.join("src/main.c"),
        "#include \"!CMSIS_FAMILY_INCLUDE!\"\n\nint main(void)\n{\n    for (;;);\n}\n",
    );
    write_file(
        &common.join("system/newlib/sbrk.c"),
        "#include \"!CMSIS_FAMILY_INCLUDE!\"\n",
    );
    write_file(&common.join("Makefile"), "include config.mk\n");
}

/// Relative paths of all files below `dir`, sorted.
pub fn file_list(dir: &Path) -> Vec<String> {
    let mut files = Vec::new();
    fs_tree::visit_dirs(dir, &mut |entry| {
        if !entry.is_dir {
            files.push(entry.relative.to_string_lossy().replace('\\', "/"));
        }
        Ok(fs_tree::Walk::Continue)
    })
    .unwrap();
    files.sort();
    files
}
