use crate::api::{User, PAGE_SIZE};
use crate::broker::{BrokerHandle, BrokerResult};
use crate::walker::Listing;
use tokio::sync::mpsc;

/// Pages buffered ahead of the consumer
const PAGE_BUFFER: usize = 2;

/// A single, non-restartable walk over one subject's listing
pub struct PageWalk {
    pages: mpsc::Receiver<BrokerResult<Vec<User>>>,
    current: std::vec::IntoIter<User>,
}

impl PageWalk {
    /// Starts fetching pages in the background
    ///
    /// The fetch task stops after the last page, after the first error, or
    /// as soon as the walk is dropped.
    pub fn start(broker: BrokerHandle, subject: impl Into<String>, listing: Listing) -> Self {
        let subject = subject.into();
        let (sender, pages) = mpsc::channel(PAGE_BUFFER);

        tokio::spawn(async move {
            let mut page = 1;
            loop {
                let result = listing.fetch(&broker, &subject, page).await;
                let more = matches!(&result, Ok(users) if users.len() == PAGE_SIZE);
                if let Ok(users) = &result {
                    tracing::debug!(
                        "Fetched {} page {} for {}: {} users",
                        listing,
                        page,
                        subject,
                        users.len()
                    );
                }

                if sender.send(result).await.is_err() || !more {
                    break;
                }
                page += 1;
            }
        });

        Self {
            pages,
            current: Vec::new().into_iter(),
        }
    }

    /// Returns the next user, or `None` once the listing is exhausted
    pub async fn next(&mut self) -> Option<BrokerResult<User>> {
        loop {
            if let Some(user) = self.current.next() {
                return Some(Ok(user));
            }
            match self.pages.recv().await? {
                Ok(users) => self.current = users.into_iter(),
                Err(e) => return Some(Err(e)),
            }
        }
    }

    /// Drains the walk into a vector, stopping at the first error
    pub async fn collect(mut self) -> BrokerResult<Vec<User>> {
        let mut users = Vec::new();
        while let Some(user) = self.next().await {
            users.push(user?);
        }
        Ok(users)
    }
}
