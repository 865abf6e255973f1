use crate::error::{AppError, Result};
use crate::events::ContentBroadcast;
use crate::models::content::{PartialSiteContent, SiteContent};
use crate::models::session::SecurityEventKind;
use crate::sanitize::{sanitize_rich_text, validate_input};
use crate::services::audit::SecurityLog;
use crate::store::{KeyValueStore, keys};
use crate::validation::content::{FieldError, ValidationOutcome, validate_site_content};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Per-field character caps applied during sanitization.
const MAX_PHONE_LENGTH: usize = 20;
const MAX_EMAIL_LENGTH: usize = 100;
const MAX_URL_LENGTH: usize = 500;
const MAX_TEXT_LENGTH: usize = 1000;
const MAX_TITLE_LENGTH: usize = 200;
const MAX_HOURS_LENGTH: usize = 50;
const MAX_LIST_ITEM_LENGTH: usize = 100;

/// The result of a content save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The sanitized snapshot that was persisted and broadcast.
    Accepted(SiteContent),
    /// The complete list of structural violations; nothing was persisted.
    Rejected(Vec<FieldError>),
}

/// The two editable lists of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentList {
    Services,
    Convenios,
}

/// Reads and writes the site-content record.
///
/// Edits flow validate -> sanitize -> persist -> broadcast; reads fall back
/// to the baked-in defaults field-by-field and are re-sanitized before they
/// reach a renderer. The storage medium stays behind the injected store.
#[derive(Clone)]
pub struct ContentService {
    store: Arc<dyn KeyValueStore>,
    channel: ContentBroadcast,
    audit: SecurityLog,
}

impl ContentService {
    pub fn new(store: Arc<dyn KeyValueStore>, channel: ContentBroadcast, audit: SecurityLog) -> Self {
        Self {
            store,
            channel,
            audit,
        }
    }

    /// Subscribes to content-updated notifications.
    ///
    /// Callers must still [`load`](Self::load) once on mount — the channel
    /// only carries snapshots published after subscription.
    pub fn subscribe(&self) -> broadcast::Receiver<SiteContent> {
        self.channel.subscribe()
    }

    /// Loads the current record, falling back to defaults where needed.
    ///
    /// A missing snapshot yields the default record; a corrupt one is
    /// traced and replaced by the defaults; individual missing fields fall
    /// back field-by-field. The result is sanitized and safe to render.
    pub fn load(&self) -> SiteContent {
        let record = match self.store.get(keys::SITE_CONTENT) {
            Ok(Some(raw)) => match sonic_rs::from_str::<PartialSiteContent>(&raw) {
                Ok(partial) => SiteContent::from_partial(partial),
                Err(e) => {
                    tracing::warn!("Stored content unparseable, using defaults: {}", e);
                    SiteContent::default()
                }
            },
            Ok(None) => SiteContent::default(),
            Err(e) => {
                tracing::warn!("Content store unreadable, using defaults: {}", e);
                SiteContent::default()
            }
        };

        sanitize_record(&record)
    }

    /// Validates, sanitizes, persists, and broadcasts a candidate record.
    ///
    /// Rejection carries every violation at once so the editor can surface
    /// them all. Only storage or serialization failures surface as `Err`.
    pub fn save(&self, candidate: &SiteContent) -> Result<SaveOutcome> {
        if let ValidationOutcome::Invalid(errors) = validate_site_content(candidate) {
            tracing::debug!("Content save rejected: {} field errors", errors.len());
            return Ok(SaveOutcome::Rejected(errors));
        }

        let snapshot = sanitize_record(candidate);
        let serialized = sonic_rs::to_string(&snapshot)
            .map_err(|e| AppError::Serialization(format!("Content snapshot: {}", e)))?;
        self.store.set(keys::SITE_CONTENT, &serialized)?;

        self.channel.publish(&snapshot);
        self.audit
            .log_event(SecurityEventKind::ContentUpdated, None);
        tracing::info!("Site content snapshot saved and broadcast");

        Ok(SaveOutcome::Accepted(snapshot))
    }

    /// Appends a value to one of the editable lists.
    ///
    /// Validation stays centralized here rather than at call sites: the
    /// value is sanitized and bounded, and the whole record is re-validated
    /// by the save. Returns the updated list.
    pub fn add_list_item(&self, list: ContentList, value: &str) -> Result<Vec<String>> {
        let item = validate_input(value, MAX_LIST_ITEM_LENGTH);
        if item.trim().is_empty() {
            return Err(AppError::Validation(
                "List entries cannot be empty".to_string(),
            ));
        }

        let mut record = self.load();
        list_of(&mut record, list).push(item);

        match self.save(&record)? {
            SaveOutcome::Accepted(saved) => Ok(owned_list(&saved, list)),
            SaveOutcome::Rejected(errors) => Err(rejection_error(errors)),
        }
    }

    /// Removes the entry at `index` from one of the editable lists.
    ///
    /// Removing the last entry is rejected: both lists must stay non-empty.
    pub fn remove_list_item(&self, list: ContentList, index: usize) -> Result<Vec<String>> {
        let mut record = self.load();
        let entries = list_of(&mut record, list);

        if index >= entries.len() {
            return Err(AppError::Validation(format!(
                "No list entry at index {}",
                index
            )));
        }
        if entries.len() == 1 {
            return Err(AppError::Validation(
                "The list must keep at least one entry".to_string(),
            ));
        }

        entries.remove(index);

        match self.save(&record)? {
            SaveOutcome::Accepted(saved) => Ok(owned_list(&saved, list)),
            SaveOutcome::Rejected(errors) => Err(rejection_error(errors)),
        }
    }
}

fn list_of(record: &mut SiteContent, list: ContentList) -> &mut Vec<String> {
    match list {
        ContentList::Services => &mut record.services,
        ContentList::Convenios => &mut record.convenios,
    }
}

fn owned_list(record: &SiteContent, list: ContentList) -> Vec<String> {
    match list {
        ContentList::Services => record.services.clone(),
        ContentList::Convenios => record.convenios.clone(),
    }
}

fn rejection_error(errors: Vec<FieldError>) -> AppError {
    let summary: Vec<String> = errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect();
    AppError::Validation(summary.join("; "))
}

/// Sanitizes every field of a record for storage or display.
///
/// `home_title` keeps the restricted inline HTML subset; every other text
/// field is reduced to plain text within its cap. Social links are length-
/// bounded and tag-stripped here; their shape is the validator's job, and
/// the render-time domain allow-list applies only to outbound deep links.
fn sanitize_record(record: &SiteContent) -> SiteContent {
    let mut sanitized = record.clone();

    sanitized.phone = validate_input(&record.phone, MAX_PHONE_LENGTH);
    sanitized.whatsapp = validate_input(&record.whatsapp, MAX_PHONE_LENGTH);
    sanitized.email = validate_input(&record.email, MAX_EMAIL_LENGTH);
    sanitized.address = validate_input(&record.address, MAX_TITLE_LENGTH);
    sanitized.working_hours.weekdays = validate_input(&record.working_hours.weekdays, MAX_HOURS_LENGTH);
    sanitized.working_hours.saturday = validate_input(&record.working_hours.saturday, MAX_HOURS_LENGTH);
    sanitized.social_media.instagram = validate_input(&record.social_media.instagram, MAX_URL_LENGTH);
    sanitized.social_media.facebook = validate_input(&record.social_media.facebook, MAX_URL_LENGTH);

    let title: String = record.home_title.chars().take(MAX_TITLE_LENGTH).collect();
    sanitized.home_title = sanitize_rich_text(&title);
    sanitized.home_subtitle = validate_input(&record.home_subtitle, MAX_TITLE_LENGTH);
    sanitized.about_text = validate_input(&record.about_text, MAX_TEXT_LENGTH);
    sanitized.mission_text = validate_input(&record.mission_text, MAX_TEXT_LENGTH);

    sanitized.services = record
        .services
        .iter()
        .map(|s| validate_input(s, MAX_LIST_ITEM_LENGTH))
        .collect();
    sanitized.convenios = record
        .convenios
        .iter()
        .map(|s| validate_input(s, MAX_LIST_ITEM_LENGTH))
        .collect();

    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::crypto::fingerprint::BrowserEnvironment;
    use crate::store::MemoryStore;

    fn service() -> (ContentService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let audit = SecurityLog::new(
            store.clone(),
            Arc::new(ManualClock::starting_now()),
            BrowserEnvironment::default(),
        );
        (
            ContentService::new(store.clone(), ContentBroadcast::new(), audit),
            store,
        )
    }

    #[test]
    fn load_without_a_snapshot_yields_defaults() {
        let (content, _store) = service();
        assert_eq!(content.load().phone, SiteContent::default().phone);
    }

    #[test]
    fn load_survives_a_corrupt_snapshot() {
        let (content, store) = service();
        store.set(keys::SITE_CONTENT, "{ not json").unwrap();
        assert_eq!(content.load(), sanitize_record(&SiteContent::default()));
    }

    #[test]
    fn save_round_trips_through_the_store() {
        let (content, _store) = service();

        let mut record = SiteContent::default();
        record.phone = "(11) 4002-8922".to_string();

        match content.save(&record).unwrap() {
            SaveOutcome::Accepted(saved) => assert_eq!(saved.phone, "(11) 4002-8922"),
            SaveOutcome::Rejected(errors) => panic!("unexpected rejection: {:?}", errors),
        }
        assert_eq!(content.load().phone, "(11) 4002-8922");
    }

    #[test]
    fn save_rejects_with_the_full_error_list() {
        let (content, store) = service();

        let mut record = SiteContent::default();
        record.email = String::new();
        record.phone = "invalido".to_string();

        match content.save(&record).unwrap() {
            SaveOutcome::Rejected(errors) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert!(fields.contains(&"email"));
                assert!(fields.contains(&"phone"));
            }
            SaveOutcome::Accepted(_) => panic!("invalid record was accepted"),
        }
        // Nothing persisted on rejection.
        assert_eq!(store.get(keys::SITE_CONTENT).unwrap(), None);
    }

    #[test]
    fn save_strips_markup_before_persisting() {
        let (content, _store) = service();

        let mut record = SiteContent::default();
        record.about_text =
            "Laboratório de referência <script>alert('xss')</script>na região.".to_string();
        record.home_title =
            "Arantes <span class=\"block\" onclick=\"x()\">Qualidade</span>".to_string();

        let SaveOutcome::Accepted(saved) = content.save(&record).unwrap() else {
            panic!("record was rejected");
        };
        assert_eq!(
            saved.about_text,
            "Laboratório de referência na região."
        );
        assert_eq!(
            saved.home_title,
            "Arantes <span class=\"block\">Qualidade</span>"
        );
    }

    #[tokio::test]
    async fn save_notifies_subscribers() {
        let (content, _store) = service();
        let mut rx = content.subscribe();

        let mut record = SiteContent::default();
        record.home_subtitle = "Novo subtítulo do site".to_string();
        content.save(&record).unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.home_subtitle, "Novo subtítulo do site");
    }

    #[test]
    fn list_commands_keep_validation_centralized() {
        let (content, _store) = service();

        let services = content
            .add_list_item(ContentList::Services, "<b>Exames de DNA</b>")
            .unwrap();
        assert_eq!(services.last().map(String::as_str), Some("Exames de DNA"));

        assert!(
            content
                .add_list_item(ContentList::Services, "<script>x()</script>")
                .is_err()
        );
        assert!(content.add_list_item(ContentList::Convenios, "   ").is_err());
    }

    #[test]
    fn removing_the_last_entry_is_rejected() {
        let (content, _store) = service();

        // Trim services down to one entry, then try to remove it.
        for _ in 0..5 {
            content.remove_list_item(ContentList::Services, 0).unwrap();
        }
        assert_eq!(content.load().services.len(), 1);
        assert!(content.remove_list_item(ContentList::Services, 0).is_err());
        assert!(content.remove_list_item(ContentList::Services, 7).is_err());
    }
}
