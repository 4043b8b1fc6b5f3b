//! 原子写文件：同目录的唯一临时文件写完后改名覆盖目标
//!
//! 记录、窗贴、发件箱三处落盘都走这里

use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// 把 `bytes` 原子地写到 `path`，目录不存在时创建
///
/// 并发写同一路径时各自使用 tempfile 生成的临时文件，互不截断，最后一次改名生效
pub async fn write_atomic(path: impl Into<PathBuf>, bytes: Vec<u8>) -> io::Result<()> {
    let path = path.into();
    tokio::task::spawn_blocking(move || write_blocking(&path, &bytes))
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
}

fn write_blocking(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
