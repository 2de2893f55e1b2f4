//! Queue + MailJob wired the way the daemon wires them

use std::sync::Arc;
use std::time::{Duration, Instant};

use courier_core::application::jobs::mail::MAIL_JOB_TYPE;
use courier_core::application::{InMemoryQueue, MailJob, MailPayload};
use courier_core::domain::{JobPayload, MessageType, QueueConfig};
use courier_core::port::mailer::mocks::{RecordingMailer, SentKind};
use courier_core::port::publisher::MessagePublisher;
use courier_core::QueueError;

async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

fn mail_queue(mailer: Arc<RecordingMailer>, retry_limit: u32) -> InMemoryQueue {
    let queue = InMemoryQueue::new(
        QueueConfig::new(2, 32).with_retry(retry_limit, Duration::from_millis(20)),
    );
    queue.register_job(Arc::new(MailJob::new(mailer)));
    queue
}

#[tokio::test]
async fn test_login_and_register_mails_are_sent() {
    let mailer = Arc::new(RecordingMailer::new());
    let queue = mail_queue(mailer.clone(), 0);
    queue.start().unwrap();

    let publisher: &dyn MessagePublisher = &queue;
    let mail_type = MessageType::new(MAIL_JOB_TYPE);
    publisher
        .publish(
            &mail_type,
            JobPayload::from_serializable(&MailPayload::login("ann@example.com", "Ann")).unwrap(),
        )
        .unwrap();
    publisher
        .publish(
            &mail_type,
            JobPayload::from_serializable(&MailPayload::register("bo@example.com", "Bo")).unwrap(),
        )
        .unwrap();

    assert!(eventually(|| mailer.sent().len() == 2).await);
    let mut sent = mailer.sent();
    sent.sort_by(|a, b| a.1.cmp(&b.1));
    assert_eq!(
        sent,
        vec![
            (SentKind::Login, "ann@example.com".to_string()),
            (SentKind::Register, "bo@example.com".to_string()),
        ]
    );

    let started = Instant::now();
    queue.stop(Duration::from_secs(1)).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(queue.stats().processed, 2);
}

#[tokio::test]
async fn test_failing_mailer_is_retried_then_dropped() {
    let queue = mail_queue(Arc::new(RecordingMailer::failing()), 2);
    queue.start().unwrap();

    queue
        .enqueue(
            &MailJob::routing_key(),
            JobPayload::from_serializable(&MailPayload::login("ann@example.com", "Ann")).unwrap(),
        )
        .unwrap();

    assert!(eventually(|| queue.stats().dropped == 1).await);
    let stats = queue.stats();
    assert_eq!(stats.failed_attempts, 3);
    assert_eq!(stats.retried, 2);
    assert_eq!(stats.processed, 0);

    queue.stop(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test]
async fn test_unknown_message_type_is_refused() {
    let queue = mail_queue(Arc::new(RecordingMailer::new()), 0);
    queue.start().unwrap();

    let err = queue
        .enqueue(&MessageType::new("sms_job"), JobPayload::new(serde_json::json!({})))
        .unwrap_err();
    assert!(matches!(err, QueueError::NoHandlerRegistered(_)));

    queue.stop(Duration::from_secs(1)).await.unwrap();
    assert!(matches!(
        queue.enqueue(&MailJob::routing_key(), JobPayload::new(serde_json::json!({}))),
        Err(QueueError::NotRunning)
    ));
}
