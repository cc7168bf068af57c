//! Send lock state.

use crate::timer::TimerHandle;

/// Lock state shared between the coordinator and its watchdogs.
///
/// `Sending` carries the snapshot size of the attempt that owns the lock;
/// there is no snapshot while `Idle`.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) enum SendState {
    #[default]
    Idle,
    Sending {
        generation: u64,
        snapshot_len: usize,
        watchdog: Option<TimerHandle>,
    },
}

impl SendState {
    pub(crate) fn is_sending(&self) -> bool {
        matches!(self, Self::Sending { .. })
    }

    /// Generation owning the lock, if any.
    pub(crate) fn generation(&self) -> Option<u64> {
        match self {
            Self::Idle => None,
            Self::Sending { generation, .. } => Some(*generation),
        }
    }

    pub(crate) fn snapshot_len(&self) -> Option<usize> {
        match self {
            Self::Idle => None,
            Self::Sending { snapshot_len, .. } => Some(*snapshot_len),
        }
    }

    /// Reset to `Idle` if `generation` owns the lock, returning its watchdog.
    ///
    /// The outer `Option` is `None` when another generation (or nobody)
    /// holds the lock.
    pub(crate) fn release(&mut self, generation: u64) -> Option<Option<TimerHandle>> {
        match self {
            Self::Sending {
                generation: owner,
                watchdog,
                ..
            } if *owner == generation => {
                let watchdog = watchdog.take();
                *self = Self::Idle;
                Some(watchdog)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sending(generation: u64) -> SendState {
        SendState::Sending {
            generation,
            snapshot_len: 3,
            watchdog: Some(TimerHandle(9)),
        }
    }

    #[test]
    fn release_by_owner_returns_watchdog() {
        let mut state = sending(4);
        assert_eq!(state.release(4), Some(Some(TimerHandle(9))));
        assert_eq!(state, SendState::Idle);
    }

    #[test]
    fn release_by_stale_generation_is_ignored() {
        let mut state = sending(5);
        assert_eq!(state.release(4), None);
        assert_eq!(state.generation(), Some(5));
        assert_eq!(state.snapshot_len(), Some(3));

        let mut idle = SendState::Idle;
        assert_eq!(idle.release(1), None);
        assert!(!idle.is_sending());
    }
}
