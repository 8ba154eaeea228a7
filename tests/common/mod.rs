#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct Fixture {
    pub root: TempDir,
    pub project: PathBuf,
    pub log: PathBuf,
    pub python: PathBuf,
}

fn write_script(path: &Path, body: &str) {
    fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// 建立假的 python 與 streamlit：venv 建立時複製 template/bin，各指令都寫入 log
pub fn fixture(venv_exit: i32, pip_exit: i32) -> Fixture {
    let root = TempDir::new().unwrap();
    let project = root.path().join("project");
    let template = root.path().join("template/bin");
    let log = root.path().join("calls.log");
    fs::create_dir_all(&project).unwrap();
    fs::create_dir_all(&template).unwrap();

    let python = root.path().join("fake-python3");
    write_script(
        &python,
        &format!(
            "echo \"venv $3\" >> '{log}'\n[ {code} -eq 0 ] || exit {code}\nmkdir -p \"$3\" && cp -R '{tpl}' \"$3/bin\"",
            log = log.display(),
            code = venv_exit,
            tpl = template.display()
        ),
    );
    write_script(
        &template.join("python"),
        &format!("echo \"python $*\" >> '{}'\nexit {}", log.display(), pip_exit),
    );
    write_script(
        &template.join("streamlit"),
        &format!(
            "echo \"streamlit $*\" >> '{}'\n[ -f \"$2\" ] || exit 2",
            log.display()
        ),
    );

    Fixture {
        root,
        project,
        log,
        python,
    }
}

impl Fixture {
    /// 指向假 python 的配置內容
    pub fn config_toml(&self) -> String {
        format!("[environment]\npython = \"{}\"\n", self.python.display())
    }

    /// 讓 geo-owl 執行檔從專案目錄讀到配置
    pub fn write_project_config(&self) {
        fs::write(self.project.join("geo-owl.toml"), self.config_toml()).unwrap();
    }

    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn write_entry(&self) {
        fs::write(self.project.join("geo_placer_web.py"), "import streamlit as st\n").unwrap();
    }
}
