use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::relay::protocol::ConnectionId;

const SUFFIX_LEN: usize = 16;

/// Hands out opaque connection ids that never repeat within this process.
///
/// The counter prefix guarantees uniqueness; the random suffix keeps ids from
/// being guessable by other clients.
#[derive(Debug, Default)]
pub struct ConnectionIdAllocator {
    next: u64,
}

impl ConnectionIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> ConnectionId {
        self.next = self.next.wrapping_add(1);
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SUFFIX_LEN)
            .map(char::from)
            .collect();
        ConnectionId::new(format!("{:x}-{}", self.next, suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_and_opaque_looking() {
        let mut alloc = ConnectionIdAllocator::new();
        let ids: HashSet<ConnectionId> = (0..1000).map(|_| alloc.allocate()).collect();
        assert_eq!(ids.len(), 1000);
        assert!(
            ids.iter()
                .all(|id| id.as_str().len() > SUFFIX_LEN && id.as_str().is_ascii())
        );
    }
}
