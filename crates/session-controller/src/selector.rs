//! Main-view selection.
//!
//! The meeting shell shows exactly one prominent video feed. Selection is
//! a pure function over a [`ViewSnapshot`] so the same inputs always pick
//! the same feed, in this precedence order:
//!
//! 1. any screen-share feed (local or remote)
//! 2. the pinned participant's camera
//! 3. the local camera
//! 4. the first remote camera in roster order
//! 5. a placeholder ([`MainView::StartingCamera`] while a publish is in
//!    flight, [`MainView::NoVideo`] otherwise)

use rtc_engine::session::SessionHandle;
use rtc_engine::types::{ParticipantIdentity, TrackKind, TrackSid, TrackSource};

/// One candidate video feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFeed {
    /// Server-assigned id of the publication backing this feed.
    pub sid: TrackSid,
    /// Who is publishing the feed.
    pub participant: ParticipantIdentity,
    /// What the feed shows.
    pub source: TrackSource,
    /// Whether the feed belongs to the local participant.
    pub is_local: bool,
}

/// The feed (or placeholder) the shell should show prominently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MainView {
    /// Show this feed.
    Feed(VideoFeed),
    /// No feed yet, but a publish is in flight.
    StartingCamera,
    /// No feed and nothing pending.
    NoVideo,
}

/// Inputs to main-view selection, captured at one instant.
#[derive(Debug, Clone, Default)]
pub struct ViewSnapshot {
    /// Candidate video feeds, local participant's first, then remotes in
    /// roster order.
    pub feeds: Vec<VideoFeed>,
    /// The participant the user pinned, if any.
    pub pinned: Option<ParticipantIdentity>,
    /// Whether an initial publish is still in flight.
    pub publish_in_flight: bool,
}

impl ViewSnapshot {
    /// Capture the current candidate feeds from the session.
    ///
    /// Only publications with a live track qualify as candidates; a
    /// publication whose track has been torn down cannot be rendered.
    #[must_use]
    pub fn capture(
        session: &dyn SessionHandle,
        pinned: Option<ParticipantIdentity>,
        publish_in_flight: bool,
    ) -> Self {
        let mut feeds = Vec::new();

        let local = session.local_participant();
        let local_identity = local.identity();
        for publication in local.publications() {
            if publication.kind() == TrackKind::Video && publication.track().is_some() {
                feeds.push(VideoFeed {
                    sid: publication.sid(),
                    participant: local_identity.clone(),
                    source: publication.source(),
                    is_local: true,
                });
            }
        }

        for remote in session.remote_participants() {
            let identity = remote.identity();
            for publication in remote.publications() {
                if publication.kind() == TrackKind::Video && publication.track().is_some() {
                    feeds.push(VideoFeed {
                        sid: publication.sid(),
                        participant: identity.clone(),
                        source: publication.source(),
                        is_local: false,
                    });
                }
            }
        }

        Self {
            feeds,
            pinned,
            publish_in_flight,
        }
    }
}

/// Pick the feed to show prominently.
#[must_use]
pub fn select_main_view(snapshot: &ViewSnapshot) -> MainView {
    if let Some(feed) = snapshot.feeds.iter().find(|f| f.source.is_screen_share()) {
        return MainView::Feed(feed.clone());
    }

    if let Some(pinned) = &snapshot.pinned {
        if let Some(feed) = snapshot
            .feeds
            .iter()
            .find(|f| f.source == TrackSource::Camera && &f.participant == pinned)
        {
            return MainView::Feed(feed.clone());
        }
    }

    if let Some(feed) = snapshot
        .feeds
        .iter()
        .find(|f| f.source == TrackSource::Camera && f.is_local)
    {
        return MainView::Feed(feed.clone());
    }

    if let Some(feed) = snapshot
        .feeds
        .iter()
        .find(|f| f.source == TrackSource::Camera && !f.is_local)
    {
        return MainView::Feed(feed.clone());
    }

    if snapshot.publish_in_flight {
        MainView::StartingCamera
    } else {
        MainView::NoVideo
    }
}
