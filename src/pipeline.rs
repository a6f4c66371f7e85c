//! Phase wiring for the two run modes.
//!
//! ```text
//! prepare:  scan ─▶ choose ─▶ caption ─▶ orient ─▶ name ─▶ record.save
//!
//! publish:  record.load ─▶ source exists, archivable? ─▶ gate ─▶ publisher ─▶ archive ─▶ record.clear
//!                                              │          │
//!                                          NotLive    any failure: stop, file stays put
//! ```
//!
//! Both phases take their collaborators as arguments so tests can run them
//! against fakes. [`connect`] builds the real HTTP-backed ones.

use crate::api::{ApiError, GraphApiClient, MediaApi};
use crate::archive::{ArchiveError, ArchivedFile, Archiver};
use crate::config::{ConfigError, PublishSettings};
use crate::gate::{AvailabilityGate, GateError, HttpProbe, Probe};
use crate::naming::public_url;
use crate::publish::{PublishError, PublishEvent, Published, Publisher};
use crate::record::{RecordError, RecordStore, TransferRecord};
use crate::stage::{StageError, stage};
use crate::wait::{Sleeper, ThreadSleeper};
use chrono::NaiveDateTime;
use rand::Rng;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Stage(#[from] StageError),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error("Staged file {0} no longer exists (already published?)")]
    SourceMissing(PathBuf),
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error("Staged file cannot be archived, refusing to publish: {0}")]
    Unarchivable(#[source] ArchiveError),
    #[error("Published as {media_id} but archiving failed: {source}")]
    Archive {
        media_id: String,
        #[source]
        source: ArchiveError,
    },
    #[error("Failed to set up HTTP client: {0}")]
    Client(#[from] ApiError),
    #[error("Failed to set up HTTP probe: {0}")]
    Probe(#[from] reqwest::Error),
}

/// Result of a successful `publish` run.
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub record: TransferRecord,
    pub image_url: String,
    pub published: Published,
    pub archived: ArchivedFile,
}

/// The `prepare` phase.
pub fn prepare<S, R>(
    content_root: &Path,
    store: &S,
    rng: &mut R,
    now: NaiveDateTime,
) -> Result<TransferRecord, PipelineError>
where
    S: RecordStore + ?Sized,
    R: Rng + ?Sized,
{
    info!(content_root = %content_root.display(), "Preparing next image");
    Ok(stage(content_root, store, rng, now)?)
}

/// The `publish` phase.
///
/// The source file is archived only once the platform has confirmed the
/// post. A failed archive is still reported as an error, but the record is
/// kept so the file can be moved by hand.
pub fn publish<S, P, GS, A, PS>(
    store: &S,
    public_base_url: &str,
    gate: &AvailabilityGate<P, GS>,
    publisher: &Publisher<A, PS>,
    archiver: &Archiver,
    events: Option<&Sender<PublishEvent>>,
) -> Result<PublishOutcome, PipelineError>
where
    S: RecordStore + ?Sized,
    P: Probe,
    GS: Sleeper,
    A: MediaApi,
    PS: Sleeper,
{
    let record = store.load()?;
    if !record.original_path.is_file() {
        return Err(PipelineError::SourceMissing(record.original_path));
    }
    // A live post must always have somewhere to go.
    archiver
        .destination(&record.public_relative_path)
        .map_err(PipelineError::Unarchivable)?;

    let image_url = public_url(public_base_url, &record.public_relative_path);
    info!(url = %image_url, caption = %record.caption, "Publishing staged image");

    gate.await_public(&image_url)?;
    let published = publisher.run(&image_url, &record.caption, events)?;

    let archived = archiver
        .archive(&record.original_path, &record.public_relative_path)
        .map_err(|source| {
            error!(media_id = %published.media_id, error = %source, "Post is live but file was not archived");
            PipelineError::Archive {
                media_id: published.media_id.clone(),
                source,
            }
        })?;
    store.clear()?;

    Ok(PublishOutcome {
        record,
        image_url,
        published,
        archived,
    })
}

/// Gate and publisher backed by real HTTP clients and real sleeps.
pub fn connect(
    settings: &PublishSettings,
) -> Result<
    (
        AvailabilityGate<HttpProbe, ThreadSleeper>,
        Publisher<GraphApiClient, ThreadSleeper>,
    ),
    PipelineError,
> {
    let timeout = settings.credentials.timeout;
    let gate = AvailabilityGate::new(HttpProbe::new(timeout)?, ThreadSleeper, settings.gate);
    let publisher = Publisher::new(
        GraphApiClient::new(settings.credentials.clone())?,
        ThreadSleeper,
        settings.settle_delay,
        settings.status,
    );
    Ok((gate, publisher))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PollPolicy;
    use crate::record::MemoryRecordStore;
    use crate::test_helpers::{
        ApiCall, FailOn, RecordingSleeper, ScriptedApi, ScriptedProbe, write_test_jpeg,
    };
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    const BASE: &str = "https://example.org/photos";

    struct Fixture {
        _tmp: TempDir,
        source: PathBuf,
        archiver: Archiver,
        store: MemoryRecordStore,
        record: TransferRecord,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("images_to_upload/Road Trips/sea view.jpg");
        write_test_jpeg(&source, 8, 8);
        let record = TransferRecord {
            original_path: source.clone(),
            public_relative_path: "Road_Trips/sea_view_UPLOADED_AT_03-06-2024_18-42.jpg".into(),
            caption: "Road Trips // Monday, June 03, 2024".into(),
        };
        let store = MemoryRecordStore::new();
        store.save(&record).unwrap();
        let archiver = Archiver::new(tmp.path().join("uploaded_images"));
        Fixture {
            _tmp: tmp,
            source,
            archiver,
            store,
            record,
        }
    }

    fn gate(probe: &ScriptedProbe) -> AvailabilityGate<&ScriptedProbe, RecordingSleeper> {
        AvailabilityGate::new(
            probe,
            RecordingSleeper::new(),
            PollPolicy::new(6, Duration::from_secs(5)),
        )
    }

    fn publisher(api: &ScriptedApi) -> Publisher<&ScriptedApi, RecordingSleeper> {
        Publisher::new(
            api,
            RecordingSleeper::new(),
            Duration::from_secs(3),
            PollPolicy::new(10, Duration::from_secs(5)),
        )
    }

    // =========================================================================
    // publish(): success path
    // =========================================================================

    #[test]
    fn success_archives_and_clears_record() {
        let f = fixture();
        let probe = ScriptedProbe::live_from(2);
        let api = ScriptedApi::with_status_codes(&["IN_PROGRESS", "FINISHED"]);

        let outcome = publish(
            &f.store,
            BASE,
            &gate(&probe),
            &publisher(&api),
            &f.archiver,
            None,
        )
        .unwrap();

        let dest = f.archiver.root().join(&f.record.public_relative_path);
        assert_eq!(outcome.archived.path, dest);
        assert!(dest.exists());
        assert!(!f.source.exists());
        assert_eq!(outcome.published.media_id, "m-1");
        assert!(f.store.raw().is_none());
    }

    #[test]
    fn container_gets_encoded_url_and_caption() {
        let f = fixture();
        let probe = ScriptedProbe::live_from(1);
        let api = ScriptedApi::succeeding();

        let outcome = publish(
            &f.store,
            BASE,
            &gate(&probe),
            &publisher(&api),
            &f.archiver,
            None,
        )
        .unwrap();

        let expected_url =
            "https://example.org/photos/Road_Trips/sea_view_UPLOADED_AT_03-06-2024_18-42.jpg";
        assert_eq!(outcome.image_url, expected_url);
        assert_eq!(probe.probed_urls(), vec![expected_url.to_string()]);
        assert_eq!(
            api.calls()[0],
            ApiCall::Create {
                image_url: expected_url.into(),
                caption: "Road Trips // Monday, June 03, 2024".into(),
            }
        );
    }

    // =========================================================================
    // publish(): every failure leaves the source in place
    // =========================================================================

    fn assert_untouched(f: &Fixture) {
        assert!(f.source.exists(), "source must stay in place");
        assert!(!f.archiver.root().exists(), "nothing archived");
        assert_eq!(f.store.load().unwrap(), f.record, "record kept");
    }

    #[test]
    fn error_payload_on_publish_leaves_file() {
        let f = fixture();
        let probe = ScriptedProbe::live_from(1);
        let api = ScriptedApi::new(
            json!({"id": "c-1"}),
            vec![json!({"status_code": "FINISHED"})],
            json!({"error": {"message": "Rate limit", "code": 4}}),
        );

        let err = publish(
            &f.store,
            BASE,
            &gate(&probe),
            &publisher(&api),
            &f.archiver,
            None,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Publish(PublishError::PublishFailed { .. })
        ));
        assert_untouched(&f);
    }

    #[test]
    fn processing_error_leaves_file() {
        let f = fixture();
        let probe = ScriptedProbe::live_from(1);
        let api = ScriptedApi::with_status_codes(&["ERROR"]);

        let err = publish(
            &f.store,
            BASE,
            &gate(&probe),
            &publisher(&api),
            &f.archiver,
            None,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Publish(PublishError::ProcessFailed { .. })
        ));
        assert_untouched(&f);
    }

    #[test]
    fn not_live_never_contacts_api() {
        let f = fixture();
        let probe = ScriptedProbe::never_live();
        let api = ScriptedApi::succeeding();

        let err = publish(
            &f.store,
            BASE,
            &gate(&probe),
            &publisher(&api),
            &f.archiver,
            None,
        )
        .unwrap_err();

        assert!(matches!(err, PipelineError::Gate(GateError::NotLive { .. })));
        assert!(api.calls().is_empty());
        assert_untouched(&f);
    }

    #[test]
    fn missing_record_is_fatal() {
        let f = fixture();
        f.store.clear().unwrap();
        let probe = ScriptedProbe::live_from(1);
        let api = ScriptedApi::succeeding();

        let err = publish(
            &f.store,
            BASE,
            &gate(&probe),
            &publisher(&api),
            &f.archiver,
            None,
        )
        .unwrap_err();

        assert!(matches!(err, PipelineError::Record(RecordError::Missing(_))));
        assert_eq!(probe.probe_count(), 0);
    }

    #[test]
    fn vanished_source_is_fatal_before_gate() {
        let f = fixture();
        fs::remove_file(&f.source).unwrap();
        let probe = ScriptedProbe::live_from(1);
        let api = ScriptedApi::succeeding();

        let err = publish(
            &f.store,
            BASE,
            &gate(&probe),
            &publisher(&api),
            &f.archiver,
            None,
        )
        .unwrap_err();

        assert!(matches!(err, PipelineError::SourceMissing(_)));
        assert_eq!(probe.probe_count(), 0);
        assert!(api.calls().is_empty());
    }

    #[test]
    fn transport_errors_leave_file() {
        for call in [FailOn::Create, FailOn::Status, FailOn::Publish] {
            let f = fixture();
            let probe = ScriptedProbe::live_from(1);
            let api = ScriptedApi::failing_on(call);

            let err = publish(
                &f.store,
                BASE,
                &gate(&probe),
                &publisher(&api),
                &f.archiver,
                None,
            )
            .unwrap_err();

            assert!(
                matches!(err, PipelineError::Publish(PublishError::Transport { .. })),
                "{call:?}: {err:?}"
            );
            assert_untouched(&f);
        }
    }

    #[test]
    fn unarchivable_record_never_goes_public() {
        let f = fixture();
        let mut record = f.record.clone();
        record.public_relative_path = "Cats\\Dogs/pet_UPLOADED_AT_03-06-2024_18-42.jpg".into();
        f.store.save(&record).unwrap();
        let probe = ScriptedProbe::live_from(1);
        let api = ScriptedApi::succeeding();

        let err = publish(
            &f.store,
            BASE,
            &gate(&probe),
            &publisher(&api),
            &f.archiver,
            None,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Unarchivable(ArchiveError::InvalidPath(_))
        ));
        assert_eq!(probe.probe_count(), 0);
        assert!(api.calls().is_empty());
        assert!(f.source.exists());
    }

    #[test]
    fn archive_failure_after_publish_reports_media_id() {
        let f = fixture();
        // A file where the category folder should go blocks the move.
        fs::create_dir_all(f.archiver.root()).unwrap();
        fs::write(f.archiver.root().join("Road_Trips"), b"not a dir").unwrap();
        let probe = ScriptedProbe::live_from(1);
        let api = ScriptedApi::succeeding();

        let err = publish(
            &f.store,
            BASE,
            &gate(&probe),
            &publisher(&api),
            &f.archiver,
            None,
        )
        .unwrap_err();

        match err {
            PipelineError::Archive { media_id, .. } => assert_eq!(media_id, "m-1"),
            other => panic!("expected archive error, got {other:?}"),
        }
        assert!(f.source.exists());
        assert_eq!(f.store.load().unwrap(), f.record);
    }

    // =========================================================================
    // prepare()
    // =========================================================================

    #[test]
    fn prepare_then_publish() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("images_to_upload");
        write_test_jpeg(&root.join("Trips/beach.jpg"), 8, 8);
        let store = MemoryRecordStore::new();
        let now = chrono::NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(18, 42, 0)
            .unwrap();

        let record = prepare(&root, &store, &mut StdRng::seed_from_u64(5), now).unwrap();
        assert_eq!(
            record.public_relative_path,
            "Trips/beach_UPLOADED_AT_03-06-2024_18-42.jpg"
        );

        let probe = ScriptedProbe::live_from(1);
        let api = ScriptedApi::succeeding();
        let archiver = Archiver::new(tmp.path().join("uploaded_images"));
        let outcome =
            publish(&store, BASE, &gate(&probe), &publisher(&api), &archiver, None).unwrap();

        assert_eq!(
            outcome.archived.path,
            tmp.path()
                .join("uploaded_images/Trips/beach_UPLOADED_AT_03-06-2024_18-42.jpg")
        );
    }

    #[test]
    fn prepare_on_empty_root_fails() {
        let tmp = TempDir::new().unwrap();
        let store = MemoryRecordStore::new();
        let err = prepare(
            tmp.path(),
            &store,
            &mut StdRng::seed_from_u64(5),
            chrono::Local::now().naive_local(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Stage(StageError::NoCandidates(_))
        ));
    }
}
