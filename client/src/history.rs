use chrono::{DateTime, Datelike, Months, TimeZone};
use shared::{ScanId, ScanRecord};
use std::collections::HashSet;
use std::sync::Arc;

use crate::api::ScanApi;
use crate::error::{ApiError, HistoryError, SCAN_DETAIL_FAILED};

pub const SCAN_NOT_FOUND: &str = "Scan not found.";

/// Saved scans, loaded page by page.
pub struct ScanHistory {
    api: Arc<dyn ScanApi>,
    page_size: u32,
    next_page: u32,
    scans: Vec<ScanRecord>,
    total: u64,
    loaded: bool,
}

/// Scans split by age relative to a reference time. Each scan is in one group.
#[derive(Debug, Default, PartialEq)]
pub struct HistoryGroups<'a> {
    pub yesterday: Vec<&'a ScanRecord>,
    pub last_month: Vec<&'a ScanRecord>,
    pub earlier: Vec<&'a ScanRecord>,
}

impl ScanHistory {
    pub fn new(api: Arc<dyn ScanApi>, page_size: u32) -> Self {
        Self {
            api,
            page_size: page_size.max(1),
            next_page: 1,
            scans: Vec::new(),
            total: 0,
            loaded: false,
        }
    }

    pub fn scans(&self) -> &[ScanRecord] {
        &self.scans
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn has_more(&self) -> bool {
        !self.loaded || (self.scans.len() as u64) < self.total
    }

    /// Fetches the next page and returns how many new scans it added.
    pub async fn load_more(&mut self) -> Result<usize, HistoryError> {
        if !self.has_more() {
            return Ok(0);
        }

        log::info!("Loading scan history page {}", self.next_page);
        let page = self
            .api
            .list_scans(self.next_page, self.page_size)
            .await
            .map_err(|err| {
                log::error!("Error in GET /scan/scans: {}", err);
                HistoryError::Load(err)
            })?;

        let mut seen: HashSet<ScanId> = self.scans.iter().map(|s| s.id.clone()).collect();
        let before = self.scans.len();
        self.scans
            .extend(page.scans.into_iter().filter(|scan| seen.insert(scan.id.clone())));
        self.total = page.total;
        self.loaded = true;
        self.next_page += 1;

        let added = self.scans.len() - before;
        if added == 0 && (self.scans.len() as u64) < self.total {
            log::warn!(
                "Page {} added no new scans, {} of {} loaded",
                self.next_page - 1,
                self.scans.len(),
                self.total
            );
            self.total = self.scans.len() as u64;
        }
        Ok(added)
    }

    pub async fn load_all(&mut self) -> Result<usize, HistoryError> {
        let mut added = 0;
        while self.has_more() {
            added += self.load_more().await?;
        }
        Ok(added)
    }

    pub async fn delete(&mut self, id: &ScanId) -> Result<(), HistoryError> {
        self.api.delete_scan(id).await.map_err(|err| {
            log::error!("Error in DELETE /scan/scans/{}: {}", id, err);
            HistoryError::Delete(err)
        })?;

        self.scans.retain(|scan| &scan.id != id);
        self.total = self.total.saturating_sub(1);
        Ok(())
    }

    pub async fn get(&self, id: &ScanId) -> Result<ScanRecord, HistoryError> {
        self.api.get_scan(id).await.map_err(|source| {
            let message = match &source {
                ApiError::Server { status: 404, .. } => SCAN_NOT_FOUND,
                _ => SCAN_DETAIL_FAILED,
            };
            HistoryError::Detail {
                message: message.to_string(),
                source,
            }
        })
    }

    pub fn grouped_in<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> HistoryGroups<'_> {
        let today = now.date_naive();
        let yesterday = today.pred_opt();
        let month_ago = today.checked_sub_months(Months::new(1));

        let mut groups = HistoryGroups::default();
        for scan in &self.scans {
            let day = scan.created_at.with_timezone(&now.timezone()).date_naive();
            if Some(day) == yesterday {
                groups.yesterday.push(scan);
            } else if month_ago.is_some_and(|m| m.month() == day.month() && m.year() == day.year()) {
                groups.last_month.push(scan);
            } else {
                groups.earlier.push(scan);
            }
        }
        groups
    }
}
