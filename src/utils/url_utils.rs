// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sha2::{Digest, Sha256};
use url::{ParseError, Url};

/// 将可能为相对路径的URL转换为绝对路径URL
pub fn resolve_url(base_url: &Url, path: &str) -> Result<Url, ParseError> {
    base_url.join(path)
}

/// 计算数据源目录名
///
/// 对数据源（目录页）地址做 SHA-256，同一数据源的仓库总是落在同一个目录下
pub fn source_dir_name(source_url: &str) -> String {
    hex::encode(Sha256::digest(source_url.as_bytes()))
}

/// 拆分 cgit 分页参数
///
/// 返回不带 `ofs` 参数的地址与起始偏移量
pub fn split_offset(url: &str) -> (String, u64) {
    match url.split_once("?ofs=") {
        Some((base, offset)) => (base.to_string(), offset.trim().parse().unwrap_or(0)),
        None => (url.to_string(), 0),
    }
}

/// 取 URL 的主机名，解析失败返回 `None`
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_root_relative_url() {
        let base = Url::parse("http://example.com/a/b").unwrap();
        assert_eq!(
            resolve_url(&base, "/c/").unwrap().as_str(),
            "http://example.com/c/"
        );
    }

    #[test]
    fn test_resolve_relative_url() {
        let base = Url::parse("http://example.com/a/b").unwrap();
        assert_eq!(
            resolve_url(&base, "c").unwrap().as_str(),
            "http://example.com/a/c"
        );
    }

    #[test]
    fn test_source_dir_name_is_stable_and_distinct() {
        let a = source_dir_name("https://git.example.org/");
        let b = source_dir_name("https://git.example.org/");
        let c = source_dir_name("https://git.example.com/");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn test_split_offset() {
        assert_eq!(
            split_offset("https://git.example.org/?ofs=50"),
            ("https://git.example.org/".to_string(), 50)
        );
        assert_eq!(
            split_offset("https://git.example.org/"),
            ("https://git.example.org/".to_string(), 0)
        );
    }

    #[test]
    fn test_host_of() {
        assert_eq!(
            host_of("https://API.github.com/users/x"),
            Some("api.github.com".to_string())
        );
        assert_eq!(host_of("not a url"), None);
    }
}
