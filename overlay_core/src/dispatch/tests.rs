use super::*;
use crate::cache::InMemoryCache;
use crate::holder::Role;
use crate::permission::{Permission, PermissionSet};
use crate::resource::{Category, ResourceKind, TextChannel};
use serde_json::json;
use std::io;
use std::sync::{Arc, Barrier};
use std::thread;

fn dispatcher() -> OverlayDispatcher {
    OverlayDispatcher::new()
}

#[test]
fn test_create_then_update() {
    let dispatcher = dispatcher();
    let category = Category::new(Uuid::new_v4(), "Staff");
    let holder = Holder::Role(Uuid::new_v4());

    let created = dispatcher.on_create(category.clone(), holder, 0b0101, 0b1000);
    assert_eq!(created.kind(), ChangeKind::Created);
    assert_eq!(dispatcher.len(), 1);

    let update = dispatcher
        .on_update(category.clone(), holder, 0b0111, 0b1000)
        .unwrap();
    assert_eq!(update.old_allow_raw(), 0b0101);
    assert_eq!(update.old_deny_raw(), 0b1000);
    assert_eq!(update.permission_overlay().allow_raw(), 0b0111);
    assert_eq!(update.category(), &category);

    // The event created earlier shares the live overlay.
    assert_eq!(created.event().permission_overlay().allow_raw(), 0b0111);
}

#[test]
fn test_duplicate_create_is_update() {
    let dispatcher = dispatcher();
    let channel = TextChannel::new(Uuid::new_v4(), "general");
    let holder = Holder::Member(Uuid::new_v4());

    dispatcher.on_create(channel.clone(), holder, Permission::SendMessages.raw(), 0);
    let again = dispatcher.on_create(channel.clone(), holder, 0, Permission::SendMessages.raw());

    let update = again.as_update().expect("Expected an update");
    assert_eq!(update.metadata().context, json!({ "requested": "create" }));
    assert_eq!(update.old_allow(), PermissionSet::from([Permission::SendMessages]));
    assert_eq!(update.permission_overlay().deny_raw(), Permission::SendMessages.raw());
    assert_eq!(dispatcher.len(), 1);
}

#[test]
fn test_update_unknown_overlay() {
    let dispatcher = dispatcher();
    let channel = TextChannel::new(Uuid::new_v4(), "general");
    let holder = Holder::Role(Uuid::new_v4());

    let err = dispatcher.on_update(channel.clone(), holder, 1, 0).unwrap_err();
    match err {
        OverlayError::OverlayNotFound {
            resource_id,
            holder: missing,
        } => {
            assert_eq!(resource_id, channel.id);
            assert_eq!(missing, holder);
        }
        other => panic!("Expected OverlayNotFound, got {:?}", other),
    }
    assert!(dispatcher.is_empty());
}

#[test]
fn test_delete_overlay() {
    let dispatcher = dispatcher();
    let channel = TextChannel::new(Uuid::new_v4(), "general");
    let holder = Holder::Role(Uuid::new_v4());
    dispatcher.on_create(channel.clone(), holder, 0b11, 0);

    let deleted = dispatcher.on_delete(channel.clone(), holder).unwrap();
    assert_eq!(deleted.permission_overlay().allow_raw(), 0b11);
    assert!(dispatcher.get(channel.id, holder).is_none());
    assert!(dispatcher.on_delete(channel, holder).is_err());
}

#[test]
fn test_overlays_for_resource() {
    let dispatcher = dispatcher();
    let category = Category::new(Uuid::new_v4(), "Staff");
    let other = Category::new(Uuid::new_v4(), "Public");
    let role = Holder::Role(Uuid::new_v4());
    let member = Holder::Member(Uuid::new_v4());

    dispatcher.on_create(category.clone(), role, 1, 0);
    dispatcher.on_create(category.clone(), member, 2, 0);
    dispatcher.on_create(other.clone(), role, 4, 0);

    let holders: Vec<_> = dispatcher
        .overlays_for(category.id)
        .iter()
        .map(|o| o.holder())
        .collect();
    assert_eq!(holders, vec![member, role]);

    assert_eq!(dispatcher.on_resource_deleted(category.id), 2);
    assert!(dispatcher.overlays_for(category.id).is_empty());
    assert_eq!(dispatcher.len(), 1);
}

#[test]
fn test_event_log_records_changes() {
    let dispatcher = dispatcher();
    let channel = TextChannel::new(Uuid::new_v4(), "general");
    let holder = Holder::Role(Uuid::new_v4());

    dispatcher.on_create(channel.clone(), holder, 1, 0);
    dispatcher.on_update(channel.clone(), holder, 3, 0).unwrap();
    dispatcher.on_delete(channel.clone(), holder).unwrap();

    let log = dispatcher.event_log().unwrap();
    let kinds: Vec<_> = log.all().iter().map(|r| r.change).collect();
    assert_eq!(
        kinds,
        vec![ChangeKind::Created, ChangeKind::Updated, ChangeKind::Deleted]
    );

    let update = &log.all()[1];
    assert_eq!(update.old.map(|m| m.allow), Some(1));
    assert_eq!(update.new.map(|m| m.allow), Some(3));
}

#[test]
fn test_recording_disabled() {
    let config = OverlayConfig {
        record_events: false,
        ..OverlayConfig::default()
    };
    let dispatcher = OverlayDispatcher::with_config(config);
    let category = Category::new(Uuid::new_v4(), "Staff");
    dispatcher.on_create(category, Holder::Role(Uuid::new_v4()), 1, 0);

    assert!(dispatcher.event_log().is_none());
}

#[test]
fn test_dispatch_raw_notifications() {
    let dispatcher = dispatcher();
    let cache = InMemoryCache::new();
    let role = Role::new(Uuid::new_v4(), "mods", 0);
    cache.insert_role(role.clone());

    let channel_id = Uuid::new_v4();
    let notifications: Vec<ChangeNotification> = serde_json::from_value(serde_json::json!([
        {
            "action": "create",
            "resource": { "kind": "text", "id": channel_id, "name": "general" },
            "holder": { "type": "role", "id": role.id },
            "allow": 5,
            "deny": 8
        },
        {
            "action": "update",
            "resource": { "kind": "text", "id": channel_id, "name": "general" },
            "holder": { "type": "role", "id": role.id },
            "allow": 7,
            "deny": 8
        }
    ]))
    .unwrap();

    let mut results = Vec::new();
    for notification in notifications {
        results.push(dispatcher.dispatch(notification).unwrap());
    }

    let update = results[1].as_update().unwrap();
    assert_eq!(update.role(&cache), Some(role));
    assert_eq!(update.resource().kind(), ResourceKind::Text);
    assert_eq!(
        update.diff().newly_allowed().into_iter().collect::<Vec<_>>(),
        vec![Permission::KickMembers]
    );
}

#[test]
fn test_dispatch_delete_notification() {
    let dispatcher = dispatcher();
    let category = Category::new(Uuid::new_v4(), "Staff");
    let holder = Holder::Member(Uuid::new_v4());
    dispatcher.on_create(category.clone(), holder, 0b10, 0);

    let delete = ChangeNotification::Delete {
        resource: category.clone().into(),
        holder,
        correlation_id: None,
    };
    let deleted = dispatcher.dispatch(delete.clone()).unwrap();

    assert_eq!(deleted.kind(), ChangeKind::Deleted);
    assert_eq!(deleted.event().permission_overlay().allow_raw(), 0b10);
    assert!(dispatcher.get(category.id, holder).is_none());
    assert!(matches!(
        dispatcher.dispatch(delete),
        Err(OverlayError::OverlayNotFound { .. })
    ));
}

#[test]
fn test_correlation_id_reaches_event_and_log() {
    let dispatcher = dispatcher();
    let correlation_id = Uuid::new_v4();
    let channel_id = Uuid::new_v4();
    let holder_id = Uuid::new_v4();

    let notifications: Vec<ChangeNotification> = serde_json::from_value(json!([
        {
            "action": "create",
            "resource": { "kind": "voice", "id": channel_id, "name": "lounge" },
            "holder": { "type": "member", "id": holder_id },
            "allow": 1
        },
        {
            "action": "update",
            "resource": { "kind": "voice", "id": channel_id, "name": "lounge" },
            "holder": { "type": "member", "id": holder_id },
            "allow": 3,
            "correlation_id": correlation_id
        }
    ]))
    .unwrap();
    assert_eq!(notifications[0].correlation_id(), None);

    let results: Vec<_> = notifications
        .into_iter()
        .map(|n| dispatcher.dispatch(n).unwrap())
        .collect();

    assert_eq!(results[0].event().metadata().correlation_id, None);
    assert_eq!(results[1].event().metadata().correlation_id, Some(correlation_id));

    let records = dispatcher.event_log().unwrap().for_resource(channel_id);
    let ids: Vec<_> = records.iter().map(|r| r.correlation_id).collect();
    assert_eq!(ids, vec![None, Some(correlation_id)]);
}

#[test]
fn test_unbounded_event_log_from_config() {
    let config = OverlayConfig::from_toml_str("unbounded_event_log = true").unwrap();
    let dispatcher = OverlayDispatcher::with_config(config);
    assert_eq!(dispatcher.event_log().unwrap().max_size(), None);

    let bounded = OverlayDispatcher::new();
    assert_eq!(bounded.event_log().unwrap().max_size(), Some(1024));
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn warnings_while(f: impl FnOnce()) -> String {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);

    let bytes = logs.0.lock().unwrap_or_else(PoisonError::into_inner).clone();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[test]
fn test_conflicting_masks_warning() {
    let both = Permission::SendMessages.raw();
    let staff = || Category::new(Uuid::new_v4(), "Staff");
    let role = || Holder::Role(Uuid::new_v4());

    let warned = warnings_while(|| {
        dispatcher().on_create(staff(), role(), both, both);
    });
    assert!(warned.contains("Overlay both allows and denies the same bits"));
    assert!(warned.contains(&format!("conflicting={}", both)));

    let quiet = OverlayDispatcher::with_config(OverlayConfig {
        warn_on_conflicting_masks: false,
        ..OverlayConfig::default()
    });
    let silent = warnings_while(|| {
        quiet.on_create(staff(), role(), both, both);
    });
    assert!(silent.is_empty());

    let clean = warnings_while(|| {
        dispatcher().on_create(staff(), role(), 1, 2);
    });
    assert!(clean.is_empty());
}

#[test]
fn test_update_racing_delete_never_follows_it() {
    let dispatcher = Arc::new(dispatcher());
    let holder = Holder::Role(Uuid::new_v4());

    for _ in 0..200 {
        let channel = TextChannel::new(Uuid::new_v4(), "general");
        dispatcher.on_create(channel.clone(), holder, 1, 0);
        let barrier = Arc::new(Barrier::new(2));

        let updater = {
            let dispatcher = Arc::clone(&dispatcher);
            let barrier = Arc::clone(&barrier);
            let channel = channel.clone();
            thread::spawn(move || {
                barrier.wait();
                dispatcher.on_update(channel, holder, 3, 0).is_ok()
            })
        };
        let deleter = {
            let dispatcher = Arc::clone(&dispatcher);
            let barrier = Arc::clone(&barrier);
            let channel = channel.clone();
            thread::spawn(move || {
                barrier.wait();
                dispatcher.on_delete(channel, holder).is_ok()
            })
        };

        let updated = updater.join().unwrap();
        assert!(deleter.join().unwrap());
        assert!(dispatcher.get(channel.id, holder).is_none());

        let kinds: Vec<_> = dispatcher
            .event_log()
            .unwrap()
            .for_resource(channel.id)
            .iter()
            .map(|r| r.change)
            .collect();
        let expected = if updated {
            vec![ChangeKind::Created, ChangeKind::Updated, ChangeKind::Deleted]
        } else {
            vec![ChangeKind::Created, ChangeKind::Deleted]
        };
        assert_eq!(kinds, expected);
    }
}
