//! Allocation with out-of-band delivery
//!
//! Delivery runs after the allocation is durable in the store and never
//! changes its outcome: a credential counts as issued even if the message
//! is lost. The pool is refreshed after every successful issue so the next
//! call sees any edits made to the table since the last load.

use std::sync::Arc;

use notifier::Notifier;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::pool::{Allocation, PoolManager};

/// Message sent to the requester. `{vendor}` and `{credential}` are replaced.
pub const DEFAULT_MESSAGE_TEMPLATE: &str = "Olá! Sua senha para {vendor} é: {credential}";

/// Result of [`Issuer::allocate_and_notify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issued {
    pub allocation: Allocation,
    /// `None` when no contact was given or no channel is configured.
    pub notified: Option<bool>,
}

/// Couples the pool with a delivery channel.
pub struct Issuer {
    pool: Arc<PoolManager>,
    notifier: Arc<dyn Notifier>,
    template: String,
}

impl Issuer {
    pub fn new(pool: Arc<PoolManager>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            pool,
            notifier,
            template: DEFAULT_MESSAGE_TEMPLATE.to_string(),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn pool(&self) -> &Arc<PoolManager> {
        &self.pool
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Allocate for `vendor`, deliver to `contact` if given, then refresh.
    pub async fn allocate_and_notify(&self, vendor: &str, contact: Option<&str>) -> Result<Issued> {
        let allocation = self.pool.allocate(vendor).await?;

        let contact = contact.map(str::trim).filter(|c| !c.is_empty());
        let notified = match contact {
            Some(address) if self.notifier.is_configured() => {
                Some(self.deliver(address, &allocation).await)
            }
            Some(_) => {
                debug!(notifier = self.notifier.id(), "contact given but no channel configured");
                metrics::counter!("credential_notifications_total", "outcome" => "skipped")
                    .increment(1);
                None
            }
            None => None,
        };

        self.pool.refresh().await;
        Ok(Issued {
            allocation,
            notified,
        })
    }

    async fn deliver(&self, address: &str, allocation: &Allocation) -> bool {
        let message = self.render(allocation);
        let sent = match self.notifier.send(address, &message).await {
            Ok(id) => {
                info!(
                    notifier = self.notifier.id(),
                    vendor = %allocation.vendor,
                    delivery_id = %id,
                    "credential delivered"
                );
                true
            }
            Err(e) => {
                warn!(
                    notifier = self.notifier.id(),
                    vendor = %allocation.vendor,
                    error = %e,
                    "credential delivery failed"
                );
                false
            }
        };
        let outcome = if sent { "sent" } else { "failed" };
        metrics::counter!("credential_notifications_total", "outcome" => outcome).increment(1);
        sent
    }

    fn render(&self, allocation: &Allocation) -> String {
        self.template
            .replace("{vendor}", &allocation.vendor)
            .replace("{credential}", &allocation.credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::layout::SheetLayout;
    use notifier::{DisabledNotifier, NotifyError};
    use pool_store::{MemoryStore, Table};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records every send; fails when `fail` is set.
    #[derive(Default)]
    struct RecordingNotifier {
        fail: bool,
        sent: Mutex<Vec<(String, String)>>,
    }

    impl Notifier for RecordingNotifier {
        fn id(&self) -> &str {
            "recording"
        }

        fn is_configured(&self) -> bool {
            true
        }

        fn send<'a>(
            &'a self,
            address: &'a str,
            message: &'a str,
        ) -> Pin<Box<dyn Future<Output = notifier::Result<String>> + Send + 'a>> {
            Box::pin(async move {
                self.sent
                    .lock()
                    .unwrap()
                    .push((address.to_string(), message.to_string()));
                if self.fail {
                    Err(NotifyError::Rejected {
                        status: 400,
                        body: "bad number".into(),
                    })
                } else {
                    Ok("SM123".to_string())
                }
            })
        }
    }

    fn rows() -> Table {
        [["Vendor", "Code", "Status"], ["Acme", "A1", ""], ["Acme", "A2", ""]]
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    async fn issuer(store: Arc<MemoryStore>, notifier: Arc<dyn Notifier>) -> Issuer {
        let pool = PoolManager::new(store, SheetLayout::single_slot(), Duration::from_secs(5)).await;
        Issuer::new(Arc::new(pool), notifier)
    }

    #[tokio::test]
    async fn delivers_rendered_message() {
        let notifier = Arc::new(RecordingNotifier::default());
        let issuer = issuer(Arc::new(MemoryStore::new(rows())), notifier.clone()).await;

        let issued = issuer
            .allocate_and_notify("acme", Some(" 5511999990000 "))
            .await
            .unwrap();
        assert_eq!(issued.allocation.credential, "A1");
        assert_eq!(issued.notified, Some(true));

        let sent = notifier.sent.lock().unwrap().clone();
        assert_eq!(
            sent,
            vec![(
                "5511999990000".to_string(),
                "Olá! Sua senha para Acme é: A1".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn delivery_failure_keeps_allocation() {
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        let store = Arc::new(MemoryStore::new(rows()));
        let issuer = issuer(store.clone(), notifier).await;

        let issued = issuer.allocate_and_notify("acme", Some("+1555")).await.unwrap();
        assert_eq!(issued.notified, Some(false));
        assert_eq!(store.cell(2, "C").await, "Usada");

        let next = issuer.allocate_and_notify("acme", None).await.unwrap();
        assert_eq!(next.allocation.credential, "A2");
    }

    #[tokio::test]
    async fn no_contact_or_no_channel_means_not_attempted() {
        let issuer = issuer(
            Arc::new(MemoryStore::new(rows())),
            Arc::new(DisabledNotifier),
        )
        .await;

        let issued = issuer.allocate_and_notify("acme", None).await.unwrap();
        assert_eq!(issued.notified, None);

        let issued = issuer.allocate_and_notify("acme", Some("+1555")).await.unwrap();
        assert_eq!(issued.notified, None);
    }

    #[tokio::test]
    async fn blank_contact_is_ignored() {
        let notifier = Arc::new(RecordingNotifier::default());
        let issuer = issuer(Arc::new(MemoryStore::new(rows())), notifier.clone()).await;

        let issued = issuer.allocate_and_notify("acme", Some("   ")).await.unwrap();
        assert_eq!(issued.notified, None);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn not_found_skips_delivery() {
        let notifier = Arc::new(RecordingNotifier::default());
        let issuer = issuer(Arc::new(MemoryStore::new(rows())), notifier.clone()).await;

        let err = issuer
            .allocate_and_notify("ghost", Some("+1555"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::VendorUnknown(_)));
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn refreshes_after_issue() {
        let store = Arc::new(MemoryStore::new(rows()));
        let issuer = issuer(store.clone(), Arc::new(DisabledNotifier)).await;

        // Edit made behind the pool's back, picked up by the post-issue refresh.
        let mut table = rows();
        table.push(vec!["Globex".into(), "G1".into(), String::new()]);
        store.set_rows(table).await;

        issuer.allocate_and_notify("acme", None).await.unwrap();
        let issued = issuer.allocate_and_notify("globex", None).await.unwrap();
        assert_eq!(issued.allocation.credential, "G1");
    }

    #[tokio::test]
    async fn custom_template() {
        let notifier = Arc::new(RecordingNotifier::default());
        let issuer = issuer(Arc::new(MemoryStore::new(rows())), notifier.clone())
            .await
            .with_template("{vendor} code {credential}");

        issuer.allocate_and_notify("acme", Some("+1")).await.unwrap();
        assert_eq!(notifier.sent.lock().unwrap()[0].1, "Acme code A1");
    }
}
