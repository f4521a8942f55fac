use crate::{Result, TileError};
use dyn_stack::{GlobalPodBuffer, PodStack, StackReq};
use parking_lot::Mutex;

/// Scratch memory of a scheduling region, one buffer per worker.
///
/// Each worker only ever touches the slot matching its thread index, so the locks are never
/// contended.
pub(crate) struct Workspace {
    req: StackReq,
    slots: Vec<Mutex<GlobalPodBuffer>>,
}

impl Workspace {
    pub fn new(workers: usize, req: StackReq) -> Result<Self> {
        let slots = (0..Ord::max(workers, 1))
            .map(|_| {
                GlobalPodBuffer::try_new(req)
                    .map(Mutex::new)
                    .map_err(|_| TileError::OutOfMemory {
                        bytes: req.size_bytes(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { req, slots })
    }

    #[inline]
    pub fn req(&self) -> StackReq {
        self.req
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Runs `f` on the scratch buffer of `worker`.
    pub fn with_stack<R>(&self, worker: usize, f: impl FnOnce(PodStack<'_>) -> R) -> R {
        let mut slot = self.slots[worker % self.slots.len()].lock();
        f(PodStack::new(&mut slot))
    }
}

/// Whether a workspace sized for `have` can serve a request for `need`. Empty requests are
/// always served.
#[inline]
pub(crate) fn covers(have: StackReq, need: StackReq) -> bool {
    need.size_bytes() == 0
        || (need.size_bytes() <= have.size_bytes() && need.align_bytes() <= have.align_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_hold_the_requested_size() {
        let req = StackReq::new::<f64>(32);
        let workspace = Workspace::new(3, req).unwrap();
        assert_eq!(workspace.len(), 3);
        for worker in 0..5 {
            workspace.with_stack(worker, |stack| {
                let (buf, _) = stack.make_raw::<f64>(32);
                buf.fill(worker as f64);
                assert!(buf.iter().all(|&x| x == worker as f64));
            });
        }
    }

    #[test]
    fn coverage() {
        let big = StackReq::new::<f64>(64);
        let small = StackReq::new::<f64>(8);
        assert!(covers(big, small));
        assert!(!covers(small, big));
        assert!(covers(small, StackReq::empty()));
        assert!(covers(StackReq::empty(), StackReq::new::<f64>(0)));
        assert!(!covers(StackReq::empty(), StackReq::new::<u8>(1)));
    }
}
