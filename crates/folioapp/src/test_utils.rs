use crate::commands::Session;
use crate::config::FolioConfig;
use crate::ledger::{Ledger, MemKv};
use crate::model::{Grade, Homeroom, RemoteFile, StudentRecord};
use crate::remote::{MemRemote, MemRoster};
use std::sync::Arc;

pub struct TestEnv {
    pub remote: Arc<MemRemote>,
    pub roster: MemRoster,
    pub ledger: Ledger<MemKv>,
    pub config: FolioConfig,
}

impl TestEnv {
    pub fn new(files: impl IntoIterator<Item = RemoteFile>) -> Self {
        Self {
            remote: Arc::new(MemRemote::with_files(files)),
            roster: MemRoster::new(roster()),
            ledger: Ledger::new(MemKv::new()),
            config: FolioConfig::default(),
        }
    }

    pub fn session(&self) -> Session<'_, MemRemote, MemKv> {
        Session::new(&self.remote, &self.ledger, &self.config)
    }

    pub fn file(&self, id: &str) -> RemoteFile {
        self.remote.snapshot(id).expect("file exists")
    }
}

pub fn student(
    id: u32,
    grade: Grade,
    homeroom: Homeroom,
    number: u32,
    last: &str,
    first: &str,
    email: &str,
    folder_id: Option<&str>,
) -> StudentRecord {
    StudentRecord {
        id,
        grade,
        homeroom,
        homeroom_number: number,
        last: last.into(),
        first: first.into(),
        email: email.into(),
        folder_id: folder_id.map(str::to_string),
    }
}

pub fn roster() -> Vec<StudentRecord> {
    vec![
        student(1234567, Grade::J1, Homeroom::A, 7, "山田", "太郎", "t-yamada@school.example", Some("folder-yamada")),
        student(1234568, Grade::J1, Homeroom::A, 8, "佐藤", "花子", "h-sato@school.example", Some("folder-sato")),
        student(2345678, Grade::J1, Homeroom::D, 9, "tanaka", "ichiro", "i-tanaka@school.example", None),
        student(3456789, Grade::H1, Homeroom::D, 13, "鈴木", "次郎", "j-suzuki@school.example", Some("folder-suzuki")),
    ]
}
