use rapport::application_impl::RealNotificationService;
use rapport::application_port::{NotificationError, NotificationService};
use rapport::domain_model::*;
use rapport::infra_memory::MemoryNotificationRepo;
use std::sync::Arc;

fn service() -> RealNotificationService {
    RealNotificationService::new(Arc::new(MemoryNotificationRepo::new()))
}

fn request_payload() -> NotificationPayload {
    NotificationPayload::ConnectionRequest {
        connection_id: ConnectionId(uuid::Uuid::new_v4()),
        requester_id: UserId(uuid::Uuid::new_v4()),
        requester_name: "alice".to_owned(),
    }
}

#[tokio::test]
async fn created_notifications_start_unread_with_structured_payloads() {
    let service = service();
    let user = UserId(uuid::Uuid::new_v4());

    let created = service
        .create_notification(
            user,
            "New connection request",
            "alice wants to connect with you",
            request_payload(),
        )
        .await
        .unwrap();
    assert!(!created.is_read);
    assert_eq!(created.kind, NotificationKind::ConnectionRequest);

    let inbox = service
        .user_notifications(user, InboxQuery::default())
        .await
        .unwrap();
    assert_eq!(inbox.len(), 1);
    match &inbox[0].payload {
        NotificationPayload::ConnectionRequest { requester_name, .. } => {
            assert_eq!(requester_name, "alice");
        }
        other => panic!("expected a connection.request payload, got {other:?}"),
    }
}

#[tokio::test]
async fn mark_read_is_idempotent() {
    let service = service();
    let user = UserId(uuid::Uuid::new_v4());

    let created = service
        .create_notification(user, "t", "m", request_payload())
        .await
        .unwrap();

    let first = service
        .mark_read(created.notification_id, user)
        .await
        .unwrap();
    assert!(first.is_read);

    // second call: same final state, no error
    let second = service
        .mark_read(created.notification_id, user)
        .await
        .unwrap();
    assert!(second.is_read);
    assert_eq!(second.notification_id, first.notification_id);

    assert_eq!(service.unread_count(user).await.unwrap(), 0);
}

#[tokio::test]
async fn foreign_rows_and_missing_rows_are_the_same_not_found() {
    let service = service();
    let owner = UserId(uuid::Uuid::new_v4());
    let stranger = UserId(uuid::Uuid::new_v4());

    let created = service
        .create_notification(owner, "t", "m", request_payload())
        .await
        .unwrap();

    let foreign_mark = service
        .mark_read(created.notification_id, stranger)
        .await
        .unwrap_err();
    let foreign_delete = service
        .delete_notification(created.notification_id, stranger)
        .await
        .unwrap_err();
    let missing = service
        .mark_read(NotificationId(uuid::Uuid::new_v4()), owner)
        .await
        .unwrap_err();

    // indistinguishable: same variant, same stable message
    assert!(matches!(foreign_mark, NotificationError::NotFound));
    assert!(matches!(foreign_delete, NotificationError::NotFound));
    assert!(matches!(missing, NotificationError::NotFound));
    assert_eq!(foreign_mark.to_string(), missing.to_string());
    assert_eq!(foreign_delete.to_string(), missing.to_string());

    // the stranger's attempts left the row untouched
    let inbox = service
        .user_notifications(owner, InboxQuery::default())
        .await
        .unwrap();
    assert_eq!(inbox.len(), 1);
    assert!(!inbox[0].is_read);
}

#[tokio::test]
async fn mark_all_read_reports_the_transitioned_count() {
    let service = service();
    let user = UserId(uuid::Uuid::new_v4());

    for _ in 0..3 {
        service
            .create_notification(user, "t", "m", request_payload())
            .await
            .unwrap();
    }
    let one = service
        .user_notifications(user, InboxQuery::default())
        .await
        .unwrap()[0]
        .notification_id;
    service.mark_read(one, user).await.unwrap();

    assert_eq!(service.mark_all_read(user).await.unwrap(), 2);
    assert_eq!(service.unread_count(user).await.unwrap(), 0);
    // nothing left to transition
    assert_eq!(service.mark_all_read(user).await.unwrap(), 0);
}

#[tokio::test]
async fn delete_removes_only_the_owned_row() {
    let service = service();
    let user = UserId(uuid::Uuid::new_v4());

    let first = service
        .create_notification(user, "t", "m", request_payload())
        .await
        .unwrap();
    service
        .create_notification(user, "t", "m", request_payload())
        .await
        .unwrap();

    service
        .delete_notification(first.notification_id, user)
        .await
        .unwrap();
    let inbox = service
        .user_notifications(user, InboxQuery::default())
        .await
        .unwrap();
    assert_eq!(inbox.len(), 1);

    // deleting again is the canonical not-found
    let again = service
        .delete_notification(first.notification_id, user)
        .await
        .unwrap_err();
    assert!(matches!(again, NotificationError::NotFound));
}
