use super::{CmdMessage, CmdResult};
use crate::error::{FolioError, Result};
use crate::ledger::{KvStore, Ledger};

/// Recent undoable tasks, newest first.
pub fn list<K: KvStore>(ledger: &Ledger<K>, max: usize) -> Result<CmdResult> {
    let tasks = ledger.list_recent(max)?;
    let mut result = CmdResult::default();
    if tasks.is_empty() {
        result.add_message(CmdMessage::info("No undoable tasks"));
    }
    result.tasks = tasks;
    Ok(result)
}

pub fn show<K: KvStore>(ledger: &Ledger<K>, key: &str) -> Result<CmdResult> {
    let entry = ledger
        .lookup(key)?
        .ok_or_else(|| FolioError::Api(format!("Task {} not found or expired", key)))?;
    Ok(CmdResult {
        tasks: vec![entry],
        ..Default::default()
    })
}

pub fn prune<K: KvStore>(ledger: &Ledger<K>) -> Result<CmdResult> {
    let report = ledger.prune()?;
    let removed = report.expired + report.evicted + report.corrupt;
    let message = if removed == 0 {
        CmdMessage::info("Nothing to prune")
    } else {
        CmdMessage::success(format!(
            "Pruned {} task(s): {} expired, {} over the limit, {} unreadable",
            removed, report.expired, report.evicted, report.corrupt
        ))
    };
    Ok(CmdResult {
        prune: Some(report),
        ..Default::default()
    }
    .with_message(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemKv;
    use crate::model::{Mutation, PriorState, RemoteFile, TaskKind};

    fn seeded(n: usize) -> Ledger<MemKv> {
        let ledger = Ledger::new(MemKv::new());
        for i in 0..n {
            let file = RemoteFile::new(format!("f{}", i), "a.pdf");
            ledger
                .record(TaskKind::Trash, vec![PriorState::capture(&file, &Mutation::Trash)])
                .unwrap();
        }
        ledger
    }

    #[test]
    fn test_list_respects_max() {
        let ledger = seeded(5);
        assert_eq!(list(&ledger, 3).unwrap().tasks.len(), 3);
        assert_eq!(list(&seeded(0), 3).unwrap().messages.len(), 1);
    }

    #[test]
    fn test_show_unknown_key() {
        assert!(matches!(
            show(&seeded(1), "task-1-ffffffff"),
            Err(FolioError::Api(_))
        ));
    }

    #[test]
    fn test_show_known_key() {
        let ledger = seeded(1);
        let key = ledger.list_recent(1).unwrap()[0].key.clone();
        assert_eq!(show(&ledger, &key).unwrap().tasks[0].key, key);
    }

    #[test]
    fn test_prune_on_clean_ledger() {
        let result = prune(&seeded(2)).unwrap();
        assert_eq!(result.prune.unwrap().expired, 0);
        assert_eq!(result.messages[0].content, "Nothing to prune");
    }
}
