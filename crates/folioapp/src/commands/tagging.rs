//! App-property tagging.
//!
//! - `set_properties`: write (or, with `None`, delete) arbitrary app properties
//! - `tag_year`: set the `year` property, the one tag the roster workflow relies on
//!
//! Setting a value a file already has is a no-op for that file.

use super::helpers::{dispatch, preload};
use super::{CmdResult, Session, SkippedFile};
use crate::error::{FolioError, Result};
use crate::ledger::KvStore;
use crate::model::{Mutation, MutationJob, PriorState, RemoteFile, TaskKind};
use crate::remote::RemoteStore;
use std::collections::BTreeMap;

pub const YEAR_PROPERTY: &str = "year";

fn already_set(file: &RemoteFile, properties: &BTreeMap<String, Option<String>>) -> bool {
    properties
        .iter()
        .all(|(key, value)| file.app_properties.get(key) == value.as_ref())
}

pub async fn set_properties<R, K, I>(
    session: &Session<'_, R, K>,
    ids: &[I],
    properties: &BTreeMap<String, Option<String>>,
) -> Result<CmdResult>
where
    R: RemoteStore + ?Sized + 'static,
    K: KvStore,
    I: AsRef<str>,
{
    if properties.is_empty() {
        return Err(FolioError::Api("No properties specified".to_string()));
    }
    if properties.keys().any(|k| k.trim().is_empty()) {
        return Err(FolioError::Api("Property keys cannot be empty".to_string()));
    }

    let loaded = preload(session.remote.as_ref(), ids).await?;
    let mut planned = Vec::new();
    let mut skipped = Vec::new();
    for file in &loaded.files {
        if already_set(file, properties) {
            skipped.push(SkippedFile::new(file, "already tagged"));
            continue;
        }
        let job = MutationJob::new(
            file.id.clone(),
            Mutation::SetProperties {
                properties: properties.clone(),
            },
        );
        let prior = PriorState::capture(file, &job.mutation);
        planned.push((job, prior));
    }

    let mut result = dispatch(
        session,
        TaskKind::SetProperties,
        planned,
        loaded.missing,
        "Tagged",
    )
    .await?;
    result.skipped = skipped;
    Ok(result)
}

pub async fn tag_year<R, K, I>(session: &Session<'_, R, K>, ids: &[I], year: i32) -> Result<CmdResult>
where
    R: RemoteStore + ?Sized + 'static,
    K: KvStore,
    I: AsRef<str>,
{
    if !(1000..=9999).contains(&year) {
        return Err(FolioError::Api(format!("Invalid year: {}", year)));
    }
    let properties = BTreeMap::from([(YEAR_PROPERTY.to_string(), Some(year.to_string()))]);
    set_properties(session, ids, &properties).await
}
