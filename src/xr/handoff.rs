use std::rc::Rc;

use log::info;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;
use url::{ParseError, Url};

use super::PlatformInfo;
use crate::error::{SessionError, SessionResult, XrError};
use crate::scene::SceneGraph;

const SCENE_VIEWER: &str = "intent://arvr.google.com/scene-viewer/1.2";
const AR_CORE_PACKAGE: &str = "com.google.ar.core";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HandoffOptions {
    /// Page the browser returns to when the external viewer is missing.
    pub fallback_url: Option<String>,
    pub title: Option<String>,
    /// Page URL that relative model sources are resolved against.
    pub base_url: Option<String>,
    /// Forbid the user from resizing the model in the external viewer.
    pub fixed_scale: bool,
}

/// Where a handoff session sends the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandoffTarget {
    /// Android intent opening Scene Viewer.
    SceneViewer { intent: String },
    /// Anchor href opened with `rel="ar"` for AR Quick Look.
    QuickLook { href: String },
}

impl HandoffTarget {
    pub fn url(&self) -> &str {
        match self {
            HandoffTarget::SceneViewer { intent } => intent,
            HandoffTarget::QuickLook { href } => href,
        }
    }
}

/// Opens a handoff target with the operating system.
pub trait HandoffLauncher {
    fn launch(&self, target: &HandoffTarget) -> Result<(), XrError>;
}

/// Launcher for hosts that cannot leave the page.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHandoff;

impl HandoffLauncher for NoHandoff {
    fn launch(&self, target: &HandoffTarget) -> Result<(), XrError> {
        Err(XrError::Launch(format!("cannot open {}", target.url())))
    }
}

/// Resolves a model URL against the page it was declared on.
pub fn resolve_source(src: &str, base: Option<&str>) -> SessionResult<Url> {
    let invalid =
        |err: ParseError| SessionError::NotSupported(format!("invalid model URL {src:?}: {err}"));
    match Url::parse(src) {
        Ok(url) => Ok(url),
        Err(ParseError::RelativeUrlWithoutBase) => {
            let base = base.ok_or_else(|| {
                SessionError::NotSupported(format!("relative model URL {src:?} needs a base URL"))
            })?;
            Url::parse(base)
                .and_then(|base| base.join(src))
                .map_err(invalid)
        }
        Err(err) => Err(invalid(err)),
    }
}

/// Hands the model to Google's Scene Viewer on Android.
pub struct SceneViewerSession {
    launcher: Rc<dyn HandoffLauncher>,
    platform: PlatformInfo,
    options: HandoffOptions,
}

impl SceneViewerSession {
    pub fn new(
        launcher: Rc<dyn HandoffLauncher>,
        platform: PlatformInfo,
        options: HandoffOptions,
    ) -> Self {
        Self {
            launcher,
            platform,
            options,
        }
    }

    pub fn is_available(&self, scene: &SceneGraph) -> bool {
        self.platform.android
            && scene
                .model()
                .is_some_and(|model| model.src.is_some())
    }

    pub fn intent_url(&self, src: &str) -> SessionResult<String> {
        let file = resolve_source(src, self.options.base_url.as_deref())?;
        let mut url = Url::parse(SCENE_VIEWER)
            .map_err(|err| SessionError::NotSupported(format!("bad intent base: {err}")))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("file", file.as_str());
            pairs.append_pair("mode", "ar_preferred");
            if let Some(title) = &self.options.title {
                pairs.append_pair("title", title);
            }
            if self.options.fixed_scale {
                pairs.append_pair("resizable", "false");
            }
        }

        let mut intent = format!(
            "Intent;scheme={};package={AR_CORE_PACKAGE};action=android.intent.action.VIEW;",
            file.scheme()
        );
        if let Some(fallback) = &self.options.fallback_url {
            let encoded: String = form_urlencoded::byte_serialize(fallback.as_bytes()).collect();
            intent.push_str(&format!("S.browser_fallback_url={encoded};"));
        }
        intent.push_str("end;");
        url.set_fragment(Some(&intent));
        Ok(url.into())
    }

    /// Launches Scene Viewer and returns immediately.
    pub fn enter(&mut self, scene: &SceneGraph) -> SessionResult<()> {
        let model = scene
            .model()
            .ok_or_else(|| SessionError::NotSupported("no model loaded".into()))?;
        let src = model.src.as_deref().ok_or_else(|| {
            SessionError::NotSupported(format!("model {} has no source URL", model.name))
        })?;
        let target = HandoffTarget::SceneViewer {
            intent: self.intent_url(src)?,
        };
        self.launcher.launch(&target)?;
        info!("handed {} off to Scene Viewer", model.name);
        Ok(())
    }
}

/// Hands the model's USDZ variant to AR Quick Look on iOS.
pub struct QuickLookSession {
    launcher: Rc<dyn HandoffLauncher>,
    platform: PlatformInfo,
    options: HandoffOptions,
}

impl QuickLookSession {
    pub fn new(
        launcher: Rc<dyn HandoffLauncher>,
        platform: PlatformInfo,
        options: HandoffOptions,
    ) -> Self {
        Self {
            launcher,
            platform,
            options,
        }
    }

    pub fn is_available(&self, scene: &SceneGraph) -> bool {
        self.platform.ios
            && scene
                .model()
                .is_some_and(|model| model.ios_src.is_some())
    }

    pub fn anchor_href(&self, ios_src: &str) -> SessionResult<String> {
        let mut href = resolve_source(ios_src, self.options.base_url.as_deref())?;
        let scaling = if self.options.fixed_scale { 0 } else { 1 };
        href.set_fragment(Some(&format!("allowsContentScaling={scaling}")));
        Ok(href.into())
    }

    pub fn enter(&mut self, scene: &SceneGraph) -> SessionResult<()> {
        let model = scene
            .model()
            .ok_or_else(|| SessionError::NotSupported("no model loaded".into()))?;
        let ios_src = model.ios_src.as_deref().ok_or_else(|| {
            SessionError::NotSupported(format!("model {} has no USDZ variant", model.name))
        })?;
        let target = HandoffTarget::QuickLook {
            href: self.anchor_href(ios_src)?,
        };
        self.launcher.launch(&target)?;
        info!("handed {} off to Quick Look", model.name);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::cell::RefCell;

    use super::*;

    #[derive(Default)]
    pub struct RecordingLauncher {
        pub launched: RefCell<Vec<HandoffTarget>>,
        pub fail: bool,
    }

    impl HandoffLauncher for RecordingLauncher {
        fn launch(&self, target: &HandoffTarget) -> Result<(), XrError> {
            if self.fail {
                return Err(XrError::Launch("blocked".into()));
            }
            self.launched.borrow_mut().push(target.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::RecordingLauncher;
    use super::*;
    use crate::scene::{BoundingBox, Model, SceneHandle};

    fn scene(model: Model) -> SceneGraph {
        let scene = SceneGraph::new();
        scene.replace_model(Some(model));
        scene
    }

    fn chair() -> Model {
        Model::new("chair", SceneHandle(1), BoundingBox::default())
    }

    const ANDROID: PlatformInfo = PlatformInfo {
        android: true,
        ios: false,
    };
    const IOS: PlatformInfo = PlatformInfo {
        android: false,
        ios: true,
    };

    #[test]
    fn sources_resolve_against_the_page() {
        let base = Some("https://x.test/gallery/index.html");
        assert_eq!(
            resolve_source("chair.glb", base).unwrap().as_str(),
            "https://x.test/gallery/chair.glb"
        );
        assert_eq!(
            resolve_source("/models/chair.glb", base).unwrap().as_str(),
            "https://x.test/models/chair.glb"
        );
        assert_eq!(
            resolve_source("https://cdn.test/a.glb", base).unwrap().as_str(),
            "https://cdn.test/a.glb"
        );
        assert!(matches!(
            resolve_source("chair.glb", None),
            Err(SessionError::NotSupported(_))
        ));
    }

    #[test]
    fn relative_source_is_made_absolute_in_the_intent() {
        let launcher = Rc::new(RecordingLauncher::default());
        let mut session = SceneViewerSession::new(
            launcher.clone(),
            ANDROID,
            HandoffOptions {
                base_url: Some("https://x.test/shop/".into()),
                title: Some("My chair".into()),
                ..HandoffOptions::default()
            },
        );
        let scene = scene(chair().with_src("chair.glb"));
        session.enter(&scene).unwrap();

        assert_eq!(
            launcher.launched.borrow()[0].url(),
            "intent://arvr.google.com/scene-viewer/1.2\
             ?file=https%3A%2F%2Fx.test%2Fshop%2Fchair.glb&mode=ar_preferred&title=My+chair\
             #Intent;scheme=https;package=com.google.ar.core;\
             action=android.intent.action.VIEW;end;"
        );
    }

    #[test]
    fn scene_viewer_intent_url() {
        let launcher = Rc::new(RecordingLauncher::default());
        let mut session = SceneViewerSession::new(
            launcher.clone(),
            ANDROID,
            HandoffOptions {
                fallback_url: Some("https://x.test/".into()),
                fixed_scale: true,
                ..HandoffOptions::default()
            },
        );
        let scene = scene(chair().with_src("https://x.test/chair.glb"));
        assert!(session.is_available(&scene));
        session.enter(&scene).unwrap();

        assert_eq!(
            launcher.launched.borrow()[0].url(),
            "intent://arvr.google.com/scene-viewer/1.2\
             ?file=https%3A%2F%2Fx.test%2Fchair.glb&mode=ar_preferred&resizable=false\
             #Intent;scheme=https;package=com.google.ar.core;\
             action=android.intent.action.VIEW;\
             S.browser_fallback_url=https%3A%2F%2Fx.test%2F;end;"
        );
    }

    #[test]
    fn scene_viewer_needs_android_and_a_source() {
        let launcher: Rc<dyn HandoffLauncher> = Rc::new(RecordingLauncher::default());
        let mut session =
            SceneViewerSession::new(launcher.clone(), IOS, HandoffOptions::default());
        let with_src = scene(chair().with_src("m.glb"));
        assert!(!session.is_available(&with_src));

        let mut session = SceneViewerSession::new(launcher, ANDROID, HandoffOptions::default());
        let without_src = scene(chair());
        assert!(!session.is_available(&without_src));
        assert!(matches!(
            session.enter(&without_src),
            Err(SessionError::NotSupported(_))
        ));
        assert!(matches!(
            session.enter(&SceneGraph::new()),
            Err(SessionError::NotSupported(_))
        ));
    }

    #[test]
    fn quick_look_anchor() {
        let launcher = Rc::new(RecordingLauncher::default());
        let mut session =
            QuickLookSession::new(launcher.clone(), IOS, HandoffOptions::default());
        let scene = scene(chair().with_ios_src("https://x.test/chair.usdz"));
        assert!(session.is_available(&scene));
        session.enter(&scene).unwrap();
        assert_eq!(
            launcher.launched.borrow()[0],
            HandoffTarget::QuickLook {
                href: "https://x.test/chair.usdz#allowsContentScaling=1".into()
            }
        );
    }

    #[test]
    fn launch_failure_is_reported() {
        let launcher = Rc::new(RecordingLauncher {
            fail: true,
            ..RecordingLauncher::default()
        });
        let mut session = QuickLookSession::new(launcher, IOS, HandoffOptions::default());
        let scene = scene(chair().with_ios_src("https://x.test/m.usdz"));
        assert_eq!(
            session.enter(&scene),
            Err(SessionError::Platform(XrError::Launch("blocked".into())))
        );
    }
}
