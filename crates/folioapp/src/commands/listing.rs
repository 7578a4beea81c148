use super::{CmdMessage, CmdResult};
use crate::config::FolioConfig;
use crate::error::{FolioError, Result};
use crate::remote::{list_all, ListQuery, RemoteStore};

/// Lists a folder, following page tokens up to `list_cap` files.
pub async fn list_folder<R: RemoteStore + ?Sized>(
    remote: &R,
    config: &FolioConfig,
    folder_id: &str,
) -> Result<CmdResult> {
    let folder_id = folder_id.trim();
    if folder_id.is_empty() {
        return Err(FolioError::Api("No folder given".to_string()));
    }

    let query = ListQuery::in_folder(folder_id);
    let files = list_all(remote, &query, config.page_size, config.list_cap).await?;
    let mut result = CmdResult::default();
    if files.len() >= config.list_cap {
        result.add_message(CmdMessage::warning(format!(
            "Showing the first {} files only",
            config.list_cap
        )));
    }
    result.listed_files = files;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RemoteFile;
    use crate::remote::MemRemote;

    fn folder(n: usize) -> MemRemote {
        MemRemote::with_files((0..n).map(|i| {
            RemoteFile::new(format!("f{:03}", i), format!("{:03}.pdf", i)).with_parent("P1")
        }))
    }

    #[tokio::test]
    async fn test_list_folder_pages_through() {
        let config = FolioConfig {
            page_size: 4,
            ..Default::default()
        };
        let result = list_folder(&folder(10), &config, "P1").await.unwrap();
        assert_eq!(result.listed_files.len(), 10);
        assert!(result.messages.is_empty());
    }

    #[tokio::test]
    async fn test_list_folder_caps() {
        let config = FolioConfig {
            page_size: 4,
            list_cap: 6,
            ..Default::default()
        };
        let result = list_folder(&folder(10), &config, "P1").await.unwrap();
        assert_eq!(result.listed_files.len(), 6);
        assert_eq!(result.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_list_folder_requires_id() {
        let config = FolioConfig::default();
        assert!(list_folder(&folder(1), &config, "").await.is_err());
    }
}
