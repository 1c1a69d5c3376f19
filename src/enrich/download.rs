use reqwest::StatusCode;
use std::fs;
use std::path::Path;
use url::Url;

use super::client::{build_client, url_allowed};
use super::types::DownloadError;
use crate::config::FetchConfig;

/// Extensions we are willing to persist; anything else becomes `.ico`.
const KNOWN_EXTENSIONS: &[&str] = &[".ico", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp"];

/// Download a verified icon to `{save_dir}/{user_id}/{link_id}.{ext}`,
/// replacing any previous icon for the same link.
///
/// An empty `icon_url` means nothing to do and returns `Ok(None)`. The
/// Content-Type of the response, not the URL extension, decides whether
/// the body is an image; a zero-byte body never reaches disk.
pub fn download_favicon(
    icon_url: &str,
    save_dir: &Path,
    user_id: u64,
    link_id: u64,
    config: &FetchConfig,
) -> Result<Option<String>, DownloadError> {
    if icon_url.is_empty() {
        return Ok(None);
    }

    let parsed = Url::parse(icon_url).map_err(|source| DownloadError::InvalidUrl {
        url: icon_url.to_string(),
        source,
    })?;

    if !url_allowed(&parsed, config) {
        return Err(DownloadError::PolicyDenied {
            url: icon_url.to_string(),
        });
    }

    let user_dir = save_dir.join(user_id.to_string());
    fs::create_dir_all(&user_dir)?;

    let ext = resolve_extension(&parsed, config);
    let target = user_dir.join(format!("{link_id}{ext}"));

    // one file per link: the old icon goes away before the new one lands,
    // so a refresh replaces rather than appends
    if target.exists() {
        if let Err(err) = fs::remove_file(&target) {
            log::warn!("could not remove old favicon {}: {err}", target.display());
        }
    }

    let client =
        build_client(config, config.download_timeout()).map_err(|source| {
            DownloadError::Unreachable {
                url: icon_url.to_string(),
                source,
            }
        })?;

    let mut resp = client
        .get(icon_url)
        .send()
        .map_err(|source| DownloadError::Unreachable {
            url: icon_url.to_string(),
            source,
        })?;

    let status = resp.status();
    if status != StatusCode::OK {
        return Err(DownloadError::BadStatus {
            url: icon_url.to_string(),
            status,
        });
    }

    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if !content_type.starts_with("image/") {
        return Err(DownloadError::NotAnImage {
            url: icon_url.to_string(),
            content_type,
        });
    }

    let mut file = fs::File::create(&target)?;
    if let Err(source) = resp.copy_to(&mut file) {
        let _ = fs::remove_file(&target);
        return Err(DownloadError::TruncatedBody {
            url: icon_url.to_string(),
            source,
        });
    }

    if file.metadata()?.len() == 0 {
        let _ = fs::remove_file(&target);
        return Err(DownloadError::EmptyFile {
            url: icon_url.to_string(),
        });
    }

    Ok(Some(target.to_string_lossy().to_string()))
}

/// Pick the stored file extension: URL path suffix first, Content-Type
/// probe second, `.ico` as the default for anything unknown.
fn resolve_extension(icon_url: &Url, config: &FetchConfig) -> String {
    // the parsed path never carries the query or fragment, so the suffix
    // is already clean
    let from_path = Path::new(icon_url.path())
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()));

    let ext = match from_path {
        Some(ext) => ext,
        None => extension_from_content_type(icon_url.as_str(), config),
    };

    if KNOWN_EXTENSIONS.contains(&ext.as_str()) {
        ext
    } else {
        ".ico".to_string()
    }
}

fn extension_from_content_type(icon_url: &str, config: &FetchConfig) -> String {
    let client = match build_client(config, config.probe_timeout()) {
        Ok(c) => c,
        Err(_) => return ".ico".to_string(),
    };

    let resp = match client.head(icon_url).send() {
        Ok(r) => r,
        Err(_) => return ".ico".to_string(),
    };

    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    // the header may carry parameters ("image/png; charset=..."), match on
    // the substring like the mapping always has
    if content_type.contains("image/x-icon") || content_type.contains("image/vnd.microsoft.icon") {
        ".ico".to_string()
    } else if content_type.contains("image/png") {
        ".png".to_string()
    } else if content_type.contains("image/jpeg") {
        ".jpg".to_string()
    } else if content_type.contains("image/gif") {
        ".gif".to_string()
    } else if content_type.contains("image/svg+xml") {
        ".svg".to_string()
    } else if content_type.contains("image/webp") {
        ".webp".to_string()
    } else {
        ".ico".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn icon_bytes(len: usize) -> Vec<u8> {
        vec![0x89; len]
    }

    #[test]
    fn test_empty_url_is_nothing_to_do() {
        let tmp = tempfile::tempdir().unwrap();
        let result =
            download_favicon("", tmp.path(), 1, 1, &FetchConfig::default()).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_download_writes_per_user_per_link_file() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("GET", "/assets/icon.png")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(icon_bytes(2048))
            .create();

        let tmp = tempfile::tempdir().unwrap();
        let icon_url = format!("{}/assets/icon.png", server.url());

        let path = download_favicon(&icon_url, tmp.path(), 42, 7, &FetchConfig::default())
            .unwrap()
            .unwrap();

        let expected = tmp.path().join("42").join("7.png");
        assert_eq!(Path::new(&path), expected);
        assert_eq!(fs::read(&expected).unwrap().len(), 2048);
    }

    #[test]
    fn test_html_body_with_ico_extension_rejected() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("GET", "/favicon.ico")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html>not an icon</html>")
            .create();

        let tmp = tempfile::tempdir().unwrap();
        let icon_url = format!("{}/favicon.ico", server.url());

        let err = download_favicon(&icon_url, tmp.path(), 1, 1, &FetchConfig::default())
            .unwrap_err();

        assert!(matches!(err, DownloadError::NotAnImage { .. }));
        assert!(!tmp.path().join("1").join("1.ico").exists());
    }

    #[test]
    fn test_zero_byte_body_leaves_no_file() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("GET", "/empty.png")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body("")
            .create();

        let tmp = tempfile::tempdir().unwrap();
        let icon_url = format!("{}/empty.png", server.url());

        let err = download_favicon(&icon_url, tmp.path(), 3, 9, &FetchConfig::default())
            .unwrap_err();

        assert!(matches!(err, DownloadError::EmptyFile { .. }));
        assert!(!tmp.path().join("3").join("9.png").exists());
    }

    #[test]
    fn test_non_200_rejected() {
        let mut server = mockito::Server::new();
        let _m = server.mock("GET", "/gone.png").with_status(404).create();

        let tmp = tempfile::tempdir().unwrap();
        let icon_url = format!("{}/gone.png", server.url());

        let err = download_favicon(&icon_url, tmp.path(), 1, 1, &FetchConfig::default())
            .unwrap_err();
        assert!(matches!(err, DownloadError::BadStatus { .. }));
    }

    #[test]
    fn test_redownload_overwrites_in_place() {
        let mut server = mockito::Server::new();
        let first = server
            .mock("GET", "/icon.png")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(icon_bytes(1024))
            .create();

        let tmp = tempfile::tempdir().unwrap();
        let icon_url = format!("{}/icon.png", server.url());
        let config = FetchConfig::default();

        let path_a = download_favicon(&icon_url, tmp.path(), 5, 5, &config)
            .unwrap()
            .unwrap();

        first.remove();
        let _second = server
            .mock("GET", "/icon.png")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(icon_bytes(4096))
            .create();

        let path_b = download_favicon(&icon_url, tmp.path(), 5, 5, &config)
            .unwrap()
            .unwrap();

        assert_eq!(path_a, path_b);
        assert_eq!(fs::read(&path_b).unwrap().len(), 4096);

        // no residue next to the replaced file
        let entries: Vec<_> = fs::read_dir(tmp.path().join("5")).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_unknown_extension_forced_to_ico() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("GET", "/icon.exe")
            .with_status(200)
            .with_header("content-type", "image/x-icon")
            .with_body(icon_bytes(64))
            .create();

        let tmp = tempfile::tempdir().unwrap();
        let icon_url = format!("{}/icon.exe", server.url());

        let path = download_favicon(&icon_url, tmp.path(), 1, 2, &FetchConfig::default())
            .unwrap()
            .unwrap();
        assert!(path.ends_with("/1/2.ico"));
    }

    #[test]
    fn test_extension_from_head_content_type_when_path_has_none() {
        let mut server = mockito::Server::new();
        let _head = server
            .mock("HEAD", "/icon")
            .with_status(200)
            .with_header("content-type", "image/svg+xml")
            .create();
        let _get = server
            .mock("GET", "/icon")
            .with_status(200)
            .with_header("content-type", "image/svg+xml")
            .with_body("<svg xmlns=\"http://www.w3.org/2000/svg\"/>")
            .create();

        let tmp = tempfile::tempdir().unwrap();
        let icon_url = format!("{}/icon", server.url());

        let path = download_favicon(&icon_url, tmp.path(), 8, 4, &FetchConfig::default())
            .unwrap()
            .unwrap();
        assert!(path.ends_with("/8/4.svg"));
    }

    #[test]
    fn test_query_string_does_not_leak_into_extension() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("GET", "/icon.ico")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "image/x-icon")
            .with_body(icon_bytes(64))
            .create();

        let tmp = tempfile::tempdir().unwrap();
        let icon_url = format!("{}/icon.ico?v=2", server.url());

        let path = download_favicon(&icon_url, tmp.path(), 6, 6, &FetchConfig::default())
            .unwrap()
            .unwrap();
        assert!(path.ends_with("/6/6.ico"));
    }
}
