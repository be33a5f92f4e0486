use std::{
	collections::HashMap,
	sync::{Arc, Mutex, Weak},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// One async lock per listing identifier, shared by every operation of one service.
///
/// Only orders work inside this process. Writers in other processes are fenced by the listing
/// revision instead. Entries are weak so a lock lives only while someone holds or awaits it.
#[derive(Default)]
pub(crate) struct ListingLocks {
	inner: Mutex<HashMap<Uuid, Weak<AsyncMutex<()>>>>,
}
impl ListingLocks {
	pub(crate) async fn acquire(&self, listing_id: Uuid) -> OwnedMutexGuard<()> {
		let lock = {
			let mut map = self.inner.lock().unwrap_or_else(|err| err.into_inner());

			map.retain(|_, weak| weak.strong_count() > 0);

			match map.get(&listing_id).and_then(Weak::upgrade) {
				Some(lock) => lock,
				None => {
					let lock = Arc::new(AsyncMutex::new(()));

					map.insert(listing_id, Arc::downgrade(&lock));

					lock
				},
			}
		};

		lock.lock_owned().await
	}
}
