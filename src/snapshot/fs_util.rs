//! 文件读写工具
//!
//! 快照发布流程用到的同步文件操作，所有错误都带上路径

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{AppError, AppResult};

/// 确保目录存在（会创建所有父目录）
pub fn ensure_directory(path: &Path) -> AppResult<()> {
    fs::create_dir_all(path).map_err(|e| AppError::file_write_failed(path, e))
}

/// 原子写入：先写同目录下的临时文件，再改名覆盖
pub fn write_atomic(path: &Path, data: &[u8]) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name));

    fs::write(&tmp_path, data).map_err(|e| AppError::file_write_failed(&tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| AppError::file_write_failed(path, e))
}

/// 写入文件（不做原子替换）
pub fn write_file(path: &Path, data: &[u8]) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }
    fs::write(path, data).map_err(|e| AppError::file_write_failed(path, e))
}

/// 序列化为紧凑 JSON（无多余空白、无结尾换行）
pub fn to_compact_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> AppResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| AppError::json_failed(path, e))
}

/// 写入紧凑 JSON 文件
pub fn write_json_compact<T: Serialize + ?Sized>(path: &Path, value: &T) -> AppResult<()> {
    let data = to_compact_json(path, value)?;
    write_file(path, &data)
}

/// 读取并解析 JSON 文件
pub fn read_json<T: DeserializeOwned>(path: &Path) -> AppResult<T> {
    let content = fs::read(path).map_err(|e| AppError::file_read_failed(path, e))?;
    serde_json::from_slice(&content).map_err(|e| AppError::json_failed(path, e))
}

/// 删除目录及其内容，目录不存在时视为成功
pub fn remove_directory(path: &Path) -> AppResult<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::file_delete_failed(path, e)),
    }
}

/// 计算文件内容的 SHA-256（小写十六进制）
pub fn sha256_file(path: &Path) -> AppResult<String> {
    let mut file = File::open(path).map_err(|e| AppError::file_read_failed(path, e))?;

    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];

    loop {
        let count = file
            .read(&mut buf)
            .map_err(|e| AppError::file_read_failed(path, e))?;
        if count == 0 {
            break;
        }
        hasher.update(&buf[..count]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
