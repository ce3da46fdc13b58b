use std::task::{Context, Poll};

use futures::future::LocalBoxFuture;
use futures::task::noop_waker_ref;
use futures::FutureExt;
use log::{debug, warn};

use super::{HitTestResult, Surface, XrFrame};
use crate::error::XrError;

/// Platform handle for a viewer-ray hit-test subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HitTestSource(pub u64);

pub type SourceRequest = LocalBoxFuture<'static, Result<HitTestSource, XrError>>;

/// Per-session hit testing against detected real-world surfaces.
///
/// The source is requested asynchronously. Frames that arrive before it
/// resolves produce no hits. Cancelling drops the pending request, so a
/// result that arrives afterwards is never observed.
#[derive(Default)]
pub struct HitTest {
    pending: Option<SourceRequest>,
    source: Option<HitTestSource>,
}

impl HitTest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts waiting for a source, replacing any earlier request.
    pub fn request(&mut self, request: SourceRequest) {
        self.pending = Some(request);
        self.source = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn source(&self) -> Option<HitTestSource> {
        self.source
    }

    /// Checks the pending request without blocking.
    pub fn poll(&mut self) -> Option<HitTestSource> {
        if let Some(request) = self.pending.as_mut() {
            let mut cx = Context::from_waker(noop_waker_ref());
            if let Poll::Ready(result) = request.poll_unpin(&mut cx) {
                self.pending = None;
                match result {
                    Ok(source) => {
                        debug!("hit-test source {source:?} ready");
                        self.source = Some(source);
                    }
                    Err(err) => warn!("hit-test source unavailable: {err}"),
                }
            }
        }
        self.source
    }

    /// First hit in `frame` on `surface`, once the source is ready.
    pub fn hit<'f>(&mut self, frame: &'f XrFrame, surface: Surface) -> Option<&'f HitTestResult> {
        self.poll()?;
        surface.first_hit(&frame.hits)
    }

    /// Abandons any pending request and hands back the live source, which
    /// the caller must release with the platform.
    pub fn cancel(&mut self) -> Option<HitTestSource> {
        if self.pending.take().is_some() {
            debug!("hit-test source request cancelled");
        }
        self.source.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::oneshot;
    use glam::Vec3;

    fn frame_with_floor() -> XrFrame {
        XrFrame {
            hits: vec![HitTestResult::floor(Vec3::new(0.0, 0.0, -1.0))],
            ..XrFrame::default()
        }
    }

    fn channel_request() -> (oneshot::Sender<HitTestSource>, SourceRequest) {
        let (tx, rx) = oneshot::channel();
        let request = async move {
            rx.await
                .map_err(|_| XrError::HitTestUnavailable("request dropped".into()))
        }
        .boxed_local();
        (tx, request)
    }

    #[test]
    fn hits_only_flow_once_the_source_resolves() {
        let (tx, request) = channel_request();
        let mut hit_test = HitTest::new();
        hit_test.request(request);
        let frame = frame_with_floor();

        assert!(hit_test.hit(&frame, Surface::Floor).is_none());
        tx.send(HitTestSource(7)).unwrap();
        assert_eq!(hit_test.hit(&frame, Surface::Floor), Some(&frame.hits[0]));
        assert_eq!(hit_test.source(), Some(HitTestSource(7)));
        assert!(hit_test.hit(&frame, Surface::Wall).is_none());
    }

    #[test]
    fn cancel_discards_a_late_source() {
        let (tx, request) = channel_request();
        let mut hit_test = HitTest::new();
        hit_test.request(request);
        hit_test.poll();

        assert_eq!(hit_test.cancel(), None);
        assert!(tx.send(HitTestSource(3)).is_err());
        assert!(hit_test.hit(&frame_with_floor(), Surface::Floor).is_none());
    }

    #[test]
    fn failed_request_leaves_no_source() {
        let (tx, request) = channel_request();
        let mut hit_test = HitTest::new();
        hit_test.request(request);
        drop(tx);
        assert_eq!(hit_test.poll(), None);
        assert!(!hit_test.is_pending());
    }
}
