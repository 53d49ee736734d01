//! Purge by age/count (SPEC_FULL.md §3.5).
//!
//! spec.md §9 leaves "operator intent unclear" on whose `purge`
//! semantics to follow; this crate follows the richer `v3mail`-style
//! behaviour: per-area `max_age_days`/`max_messages` from the area
//! registry override the CLI's `--days`/`--keep` fallbacks whenever
//! the area sets its own (spec.md §6.2 "Per-area purge limits ...
//! override CLI fallbacks when `--all` is used").

use chrono::Utc;

use crate::error::{ManagerError, ManagerResult};
use crate::Manager;

/// CLI-supplied fallback limits, used only where an area doesn't set
/// its own `max_age_days`/`max_messages`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PurgeLimits {
    pub max_age_days: Option<u32>,
    pub max_messages: Option<u32>,
}

#[derive(Debug)]
pub struct PurgeReport {
    pub area_tag: String,
    pub deleted: usize,
    pub dry_run: bool,
}

const SECS_PER_DAY: u32 = 86_400;

impl Manager {
    /// Deletes (or, if `dry_run`, only counts) messages in `area_tag`
    /// older than the effective `max_age_days` and/or beyond the
    /// effective `max_messages` most recent survivors. A message
    /// matching either limit is deleted; `Attribute::Deleted` is set
    /// via [`jam_base::Base::delete`], so a later `pack` reclaims the
    /// space (spec.md §4.1 "Deleted is the only legal way to mark a
    /// record absent").
    pub fn purge_area(
        &self,
        area_tag: &str,
        cli_fallback: PurgeLimits,
        dry_run: bool,
    ) -> ManagerResult<PurgeReport> {
        let area = self
            .area(area_tag)
            .ok_or_else(|| ManagerError::UnknownArea(area_tag.to_string()))?;

        let max_age_days = area.max_age_days.or(cli_fallback.max_age_days);
        let max_messages = area.max_messages.or(cli_fallback.max_messages);

        let base = self.base_for(area_tag)?;
        let headers = base.scan_headers(0, usize::MAX)?;
        let now = Utc::now().timestamp() as u32;

        let mut to_delete: Vec<u32> = Vec::new();
        if let Some(days) = max_age_days {
            let horizon = now.saturating_sub(days.saturating_mul(SECS_PER_DAY));
            to_delete.extend(
                headers
                    .iter()
                    .filter(|h| h.date_written < horizon)
                    .map(|h| h.msgnum),
            );
        }
        if let Some(keep) = max_messages {
            let keep = keep as usize;
            if headers.len() > keep {
                let cut = headers.len() - keep;
                to_delete.extend(headers[..cut].iter().map(|h| h.msgnum));
            }
        }
        to_delete.sort_unstable();
        to_delete.dedup();

        if !dry_run {
            for msgnum in &to_delete {
                base.delete(*msgnum)?;
            }
        }

        log::info!(
            "purge {area_tag}: {} message(s) {}",
            to_delete.len(),
            if dry_run { "would be deleted" } else { "deleted" }
        );

        Ok(PurgeReport {
            area_tag: area_tag.to_string(),
            deleted: to_delete.len(),
            dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use jam_types::{Area, AreaKind, FtnAddress, MessageDraft, ReceiverName, SenderName, Subject};
    use tempfile::tempdir;

    use super::*;

    fn area(dir: &std::path::Path, tag: &str, max_messages: Option<u32>) -> Area {
        Area {
            id: 1,
            tag: tag.to_string(),
            name: tag.to_string(),
            kind: AreaKind::Local,
            base_path: dir.join(tag).to_string_lossy().into_owned(),
            read_acs: String::new(),
            write_acs: String::new(),
            max_messages,
            max_age_days: None,
            origin_line: None,
            network_tag: None,
        }
    }

    fn draft(subject: &str) -> MessageDraft {
        MessageDraft {
            from: SenderName::from("alice"),
            to: ReceiverName::from("bob"),
            subject: Subject::from(subject),
            body: format!("{subject}\n"),
            reply_id: None,
            private: false,
        }
    }

    #[test]
    fn area_max_messages_overrides_cli_keep() {
        let dir = tempdir().unwrap();
        let manager = Manager::new(
            FtnAddress::from_str("1:1/1").unwrap(),
            vec![area(dir.path(), "general", Some(1))],
        );
        for i in 0..3 {
            manager.post_message("general", draft(&format!("msg{i}"))).unwrap();
        }

        let report = manager
            .purge_area("general", PurgeLimits { max_age_days: None, max_messages: Some(100) }, false)
            .unwrap();
        assert_eq!(report.deleted, 2);

        let remaining = manager.base_for("general").unwrap().scan_headers(0, usize::MAX).unwrap();
        assert_eq!(remaining.len(), 1);
    }

    #[test]
    fn dry_run_counts_without_deleting() {
        let dir = tempdir().unwrap();
        let manager = Manager::new(
            FtnAddress::from_str("1:1/1").unwrap(),
            vec![area(dir.path(), "general", None)],
        );
        for i in 0..3 {
            manager.post_message("general", draft(&format!("msg{i}"))).unwrap();
        }

        let report = manager
            .purge_area("general", PurgeLimits { max_age_days: None, max_messages: Some(1) }, true)
            .unwrap();
        assert_eq!(report.deleted, 2);
        assert!(report.dry_run);

        let remaining = manager.base_for("general").unwrap().scan_headers(0, usize::MAX).unwrap();
        assert_eq!(remaining.len(), 3);
    }
}
