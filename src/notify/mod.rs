//! Student notifications.
//!
//! Turns student lifecycle events into email and text messages, with a
//! per-student debounce window.

pub mod senders;

use crate::models::{Student, StudentEvent};
use senders::{EmailSender, LogEmailSender, LogSmsSender, SmsSender};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Which channels are active and how often a student may be notified.
#[derive(Debug, Clone)]
pub struct NotifyPolicy {
    pub enabled: bool,
    pub email: bool,
    pub sms: bool,
    pub debounce: Duration,
    /// Name used to sign messages.
    pub institution: String,
}

impl Default for NotifyPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            email: true,
            sms: true,
            debounce: Duration::from_secs(2),
            institution: "Gradebook University".to_string(),
        }
    }
}

impl From<&crate::config::NotificationConfig> for NotifyPolicy {
    fn from(config: &crate::config::NotificationConfig) -> Self {
        Self {
            enabled: config.enabled,
            email: config.email,
            sms: config.sms,
            debounce: Duration::from_secs(config.debounce_seconds),
            institution: config.institution.clone(),
        }
    }
}

/// Rendered messages for one event.
#[derive(Debug, Clone)]
struct Outgoing {
    subject: String,
    body: String,
    sms: Option<String>,
}

/// Dispatches student events to the configured senders.
pub struct NotificationService {
    policy: NotifyPolicy,
    email: Arc<dyn EmailSender>,
    sms: Arc<dyn SmsSender>,
    last_sent: Mutex<HashMap<Uuid, Instant>>,
}

impl NotificationService {
    pub fn new(policy: NotifyPolicy, email: Arc<dyn EmailSender>, sms: Arc<dyn SmsSender>) -> Self {
        Self {
            policy,
            email,
            sms,
            last_sent: Mutex::new(HashMap::new()),
        }
    }

    /// Service backed by the logging senders.
    pub fn logging(policy: NotifyPolicy) -> Self {
        Self::new(policy, Arc::new(LogEmailSender), Arc::new(LogSmsSender))
    }

    /// Notify about an event. Returns whether anything was dispatched.
    pub async fn notify(&self, event: &StudentEvent) -> bool {
        if !self.policy.enabled {
            return false;
        }

        let student = event.student();

        // Deactivation is only logged and is never debounced.
        let Some(outgoing) = self.render(event) else {
            self.forget(student.id);
            info!(
                "Student {} ({}) account deactivated",
                student.student_no.as_deref().unwrap_or("-"),
                student.display_name()
            );
            return true;
        };

        if self.is_debounced(student.id) {
            debug!("Debounced {} notification for {}", event.kind(), student.id);
            return false;
        }

        self.deliver(student, &outgoing).await;
        self.mark_sent(student.id);
        true
    }

    fn render(&self, event: &StudentEvent) -> Option<Outgoing> {
        let student = event.student();
        let name = student.display_name();
        let number = student.student_no.as_deref().unwrap_or("-");
        let first = student.first_name.as_deref().unwrap_or(&name);
        let signature = format!("Best regards,\n{}", self.policy.institution);

        let outgoing = match event {
            StudentEvent::Created(_) => Outgoing {
                subject: format!("Welcome to {}!", self.policy.institution),
                body: format!(
                    "Dear {},\n\nYour student account has been created successfully.\nStudent No: {}\n\n{}",
                    name, number, signature
                ),
                sms: Some(format!(
                    "Welcome {}! Your student account (#{}) is ready.",
                    first, number
                )),
            },
            StudentEvent::Updated(_) => Outgoing {
                subject: "Student Profile Updated".to_string(),
                body: format!(
                    "Dear {},\n\nYour student profile has been updated.\nStudent No: {}\n\n{}",
                    name, number, signature
                ),
                sms: Some(format!("Hello {}! Your profile has been updated.", first)),
            },
            StudentEvent::GradeChanged { old, new, .. } => Outgoing {
                subject: "Grade Updated".to_string(),
                body: format!(
                    "Dear {},\n\nYour grade has changed from {:.2}% ({}) to {:.2}% ({}).\n\n{}",
                    name, old.final_percent, old.letter, new.final_percent, new.letter, signature
                ),
                sms: None,
            },
            StudentEvent::Deleted(_) => return None,
        };

        Some(outgoing)
    }

    async fn deliver(&self, student: &Student, outgoing: &Outgoing) {
        if self.policy.email {
            match student.email.as_deref().filter(|e| !e.is_empty()) {
                Some(to) => {
                    if let Err(e) = self
                        .email
                        .send_email(to, &outgoing.subject, &outgoing.body)
                        .await
                    {
                        warn!("Failed to email {}: {}", to, e);
                    }
                }
                None => debug!("No email address for student {}", student.id),
            }
        }

        if let (true, Some(message)) = (self.policy.sms, outgoing.sms.as_deref()) {
            match student.phone.as_deref().filter(|p| !p.is_empty()) {
                Some(phone) => {
                    if let Err(e) = self.sms.send_sms(phone, message).await {
                        warn!("Failed to text {}: {}", phone, e);
                    }
                }
                None => debug!("No phone number for student {}", student.id),
            }
        }
    }

    fn is_debounced(&self, student_id: Uuid) -> bool {
        let last_sent = self.last_sent.lock().unwrap_or_else(|e| e.into_inner());
        last_sent
            .get(&student_id)
            .is_some_and(|at| at.elapsed() < self.policy.debounce)
    }

    fn forget(&self, student_id: Uuid) {
        self.last_sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&student_id);
    }

    fn mark_sent(&self, student_id: Uuid) {
        self.last_sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(student_id, Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Grade, LetterGrade};
    use async_trait::async_trait;
    use rust_decimal::Decimal;

    #[derive(Default)]
    struct Recorder {
        emails: Mutex<Vec<(String, String)>>,
        texts: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl EmailSender for Recorder {
        async fn send_email(&self, to: &str, subject: &str, _body: &str) -> anyhow::Result<()> {
            self.emails
                .lock()
                .unwrap()
                .push((to.to_string(), subject.to_string()));
            Ok(())
        }
    }

    #[async_trait]
    impl SmsSender for Recorder {
        async fn send_sms(&self, phone: &str, message: &str) -> anyhow::Result<()> {
            self.texts
                .lock()
                .unwrap()
                .push((phone.to_string(), message.to_string()));
            Ok(())
        }
    }

    fn student() -> Student {
        Student {
            id: Uuid::new_v4(),
            student_no: Some("S-42".to_string()),
            first_name: Some("Alan".to_string()),
            last_name: Some("Turing".to_string()),
            email: Some("alan@example.com".to_string()),
            phone: Some("555-0142".to_string()),
        }
    }

    fn service(policy: NotifyPolicy) -> (NotificationService, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let service = NotificationService::new(policy, recorder.clone(), recorder.clone());
        (service, recorder)
    }

    #[tokio::test]
    async fn test_created_sends_email_and_sms() {
        let (service, recorder) = service(NotifyPolicy::default());

        assert!(service.notify(&StudentEvent::Created(student())).await);

        let emails = recorder.emails.lock().unwrap();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].0, "alan@example.com");
        assert_eq!(emails[0].1, "Welcome to Gradebook University!");

        let texts = recorder.texts.lock().unwrap();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].1.contains("#S-42"));
    }

    #[tokio::test]
    async fn test_repeat_notifications_are_debounced() {
        let (service, recorder) = service(NotifyPolicy {
            debounce: Duration::from_secs(60),
            ..Default::default()
        });
        let s = student();

        assert!(service.notify(&StudentEvent::Created(s.clone())).await);
        assert!(!service.notify(&StudentEvent::Updated(s.clone())).await);
        assert_eq!(recorder.emails.lock().unwrap().len(), 1);

        // Other students are unaffected.
        assert!(service.notify(&StudentEvent::Updated(student())).await);
        assert_eq!(recorder.emails.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_deleted_is_never_debounced() {
        let (service, recorder) = service(NotifyPolicy {
            debounce: Duration::from_secs(60),
            ..Default::default()
        });
        let s = student();

        service.notify(&StudentEvent::Created(s.clone())).await;
        assert!(service.notify(&StudentEvent::Deleted(s)).await);
        assert_eq!(recorder.emails.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deleted_student_is_forgotten() {
        let (service, _) = service(NotifyPolicy::default());
        let s = student();

        service.notify(&StudentEvent::Created(s.clone())).await;
        assert!(service.last_sent.lock().unwrap().contains_key(&s.id));

        service.notify(&StudentEvent::Deleted(s.clone())).await;
        assert!(service.last_sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_grade_change_emails_only() {
        let (service, recorder) = service(NotifyPolicy::default());
        let event = StudentEvent::GradeChanged {
            student: student(),
            old: Grade::zero(),
            new: Grade {
                final_percent: Decimal::new(9150, 2),
                letter: LetterGrade::A,
            },
        };

        assert!(service.notify(&event).await);
        assert_eq!(recorder.emails.lock().unwrap()[0].1, "Grade Updated");
        assert!(recorder.texts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_contact_details_are_skipped() {
        let (service, recorder) = service(NotifyPolicy::default());
        let s = Student {
            email: None,
            phone: Some(String::new()),
            ..student()
        };

        assert!(service.notify(&StudentEvent::Created(s)).await);
        assert!(recorder.emails.lock().unwrap().is_empty());
        assert!(recorder.texts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_policy_sends_nothing() {
        let (service, recorder) = service(NotifyPolicy {
            enabled: false,
            ..Default::default()
        });

        assert!(!service.notify(&StudentEvent::Created(student())).await);
        assert!(recorder.emails.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_channel_toggles() {
        let (service, recorder) = service(NotifyPolicy {
            sms: false,
            ..Default::default()
        });

        service.notify(&StudentEvent::Created(student())).await;
        assert_eq!(recorder.emails.lock().unwrap().len(), 1);
        assert!(recorder.texts.lock().unwrap().is_empty());
    }
}
