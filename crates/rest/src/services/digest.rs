//! Weekly health digest.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use carebridge_persistence::types::{AlertSeverity, HealthDigest, NewHealthDigest};
use carebridge_persistence::{AppStorage, StorageResult};

fn plural(count: usize, one: &str, many: &str) -> String {
    format!("{} {}", count, if count == 1 { one } else { many })
}

/// Summarizes the seven days ending at `now` and stores the digest.
///
/// The summary counts alerts raised in the period, alerts still unread, and
/// appointments in the seven days after `now`. Highlights name each upcoming
/// appointment and each urgent alert raised in the period.
pub async fn generate_weekly_digest<S>(storage: &S, now: DateTime<Utc>) -> StorageResult<HealthDigest>
where
    S: AppStorage + ?Sized,
{
    let period_start = now - Duration::days(7);
    let horizon = now + Duration::days(7);

    let alerts = storage.list_alerts(false).await?;
    let recent: Vec<_> = alerts
        .iter()
        .filter(|a| a.created_at >= period_start && a.created_at <= now)
        .collect();
    let unread = alerts.iter().filter(|a| !a.read).count();

    let upcoming: Vec<_> = storage
        .list_appointments()
        .await?
        .into_iter()
        .filter(|a| a.is_active() && a.starts_at > now && a.starts_at <= horizon)
        .collect();

    let summary = format!(
        "In the past week: {} raised, {} unread. {} in the next 7 days.",
        plural(recent.len(), "alert", "alerts"),
        unread,
        plural(upcoming.len(), "upcoming appointment", "upcoming appointments"),
    );

    let mut highlights: Vec<String> = upcoming
        .iter()
        .map(|a| format!("Upcoming: {} on {}", a.title, a.starts_at.format("%b %-d")))
        .collect();
    highlights.extend(
        recent
            .iter()
            .filter(|a| a.severity == AlertSeverity::Urgent)
            .map(|a| format!("Urgent: {}", a.title)),
    );

    let digest = storage
        .create_digest(NewHealthDigest {
            period_start,
            period_end: now,
            summary,
            highlights,
        })
        .await?;

    info!(digest_id = %digest.id, highlights = digest.highlights.len(), "Weekly digest generated");
    Ok(digest)
}
