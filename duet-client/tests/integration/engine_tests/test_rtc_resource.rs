use bytes::Bytes;
use duet_client::{
    EngineEvent, LocalTrack, MediaSource, MediaStream, NegotiationEngine, RtcOptions,
    RtcPeerResource, SyntheticSource, TrackKind,
};
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use webrtc::media::Sample;

use crate::integration::init_tracing;

type RtcEngine = NegotiationEngine<RtcPeerResource>;

async fn rtc_engine() -> RtcEngine {
    let mut engine = NegotiationEngine::new();
    let options = RtcOptions {
        ice_servers: Vec::new(),
        gather_timeout: Duration::from_millis(500),
        loopback_candidates: true,
    };
    let resource = RtcPeerResource::new(options, engine.event_sink())
        .await
        .unwrap();
    engine.install(resource);
    engine
}

async fn negotiate(offerer: &mut RtcEngine, answerer: &mut RtcEngine) {
    let offer = offerer.create_offer().await.unwrap();
    let answer = answerer.create_answer(offer).await.unwrap();
    offerer.apply_remote_answer(answer).await.unwrap();
}

async fn audio_stream() -> MediaStream {
    SyntheticSource::new(true, false).acquire().await.unwrap()
}

fn renegotiation_raised(engine: &mut RtcEngine) -> bool {
    std::iter::from_fn(|| engine.try_next_event())
        .any(|evt| matches!(evt, EngineEvent::RenegotiationNeeded))
}

fn feed(track: LocalTrack) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let sample = Sample {
                data: Bytes::from_static(&[0xf8, 0xff, 0xfe]),
                timestamp: SystemTime::now(),
                duration: Duration::from_millis(20),
                packet_timestamp: 0,
                prev_dropped_packets: 0,
                prev_padding_packets: 0,
            };
            let _ = track.write_sample(&sample).await;
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
}

#[tokio::test]
async fn test_rtc_initial_round() {
    init_tracing();
    let mut caller = rtc_engine().await;
    let mut callee = rtc_engine().await;

    negotiate(&mut caller, &mut callee).await;

    assert!(caller.initial_round_complete());
    assert!(callee.initial_round_complete());
    assert!(!caller.is_offer_outstanding());

    caller.release().await;
    callee.release().await;
}

#[tokio::test]
async fn test_rtc_renegotiation_delivers_remote_track() {
    init_tracing();
    let mut caller = rtc_engine().await;
    let mut callee = rtc_engine().await;
    negotiate(&mut caller, &mut callee).await;

    let stream = audio_stream().await;
    assert_eq!(caller.attach_local_tracks(&stream).await.unwrap(), 1);
    assert!(renegotiation_raised(&mut caller));
    negotiate(&mut caller, &mut callee).await;

    let feeder = feed(stream.tracks()[0].clone());
    let handle = tokio::time::timeout(Duration::from_secs(20), async {
        loop {
            match callee.next_event().await {
                Some(EngineEvent::RemoteTrack(handle)) => break handle,
                Some(_) => continue,
                None => panic!("Engine event stream closed"),
            }
        }
    })
    .await
    .expect("No remote track within 20s");
    feeder.abort();

    assert_eq!(handle.kind, TrackKind::Audio);
    assert_eq!(handle.track_id, stream.track_ids()[0]);
    assert!(handle.track.is_some());

    caller.release().await;
    callee.release().await;
}

#[tokio::test]
async fn test_rtc_initial_collision_resolved_by_withdrawing() {
    init_tracing();
    let mut polite = rtc_engine().await;
    let mut impolite = rtc_engine().await;

    let _withdrawn = polite.create_offer().await.unwrap();
    let kept = impolite.create_offer().await.unwrap();

    polite.rollback().await.unwrap();
    assert!(!polite.is_offer_outstanding());

    let answer = polite.create_answer(kept).await.unwrap();
    impolite.apply_remote_answer(answer).await.unwrap();

    assert!(polite.initial_round_complete());
    assert!(impolite.initial_round_complete());
    assert!(!impolite.is_offer_outstanding());

    polite.release().await;
    impolite.release().await;
}

#[tokio::test]
async fn test_rtc_renegotiation_collision_resolved_by_withdrawing() {
    init_tracing();
    let mut polite = rtc_engine().await;
    let mut impolite = rtc_engine().await;
    negotiate(&mut impolite, &mut polite).await;

    polite.attach_local_tracks(&audio_stream().await).await.unwrap();
    impolite
        .attach_local_tracks(&audio_stream().await)
        .await
        .unwrap();
    assert!(renegotiation_raised(&mut polite));
    assert!(renegotiation_raised(&mut impolite));

    let _withdrawn = polite.create_offer().await.unwrap();
    let kept = impolite.create_offer().await.unwrap();

    polite.rollback().await.unwrap();
    let answer = polite.create_answer(kept).await.unwrap();
    impolite.apply_remote_answer(answer).await.unwrap();
    assert!(!impolite.is_offer_outstanding());

    // The withdrawn side still owes its track and offers again.
    assert!(renegotiation_raised(&mut polite));
    negotiate(&mut polite, &mut impolite).await;
    assert!(!polite.is_offer_outstanding());

    polite.release().await;
    impolite.release().await;
}
