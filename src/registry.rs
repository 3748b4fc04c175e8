use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

/// 已创建磁盘的名字登记表。
/// 镜像文件都放在一个目录下，名字按行存在目录里的登记文件中，
/// 添加时追加一行，删除时整个重写。
#[derive(Debug)]
pub struct DiskRegistry {
    dir: PathBuf,
    names: Vec<String>,
}

const NAMES_FILE: &str = ".disknames";

impl DiskRegistry {
    /// 打开（必要时创建）磁盘目录并读入已登记的名字。
    pub fn open(dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(dir)?;

        let names_path = dir.join(NAMES_FILE);
        let names = if names_path.exists() {
            fs::read_to_string(&names_path)?
                .lines()
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect()
        } else {
            Vec::new()
        };

        Ok(Self {
            dir: dir.to_path_buf(),
            names,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// 名字对应的镜像文件路径。
    pub fn disk_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// 登记一个新名字（追加写入登记文件）。
    pub fn add(&mut self, name: &str) -> io::Result<()> {
        self.names.push(name.to_string());

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(NAMES_FILE))?;
        writeln!(file, "{}", name)?;
        Ok(())
    }

    /// 注销一个名字并重写登记文件。镜像文件由调用方删除。
    pub fn remove(&mut self, name: &str) -> io::Result<()> {
        self.names.retain(|n| n != name);

        let mut file = fs::File::create(self.dir.join(NAMES_FILE))?;
        for n in &self.names {
            writeln!(file, "{}", n)?;
        }
        Ok(())
    }
}
