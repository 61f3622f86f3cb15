use fluent_clicks::{config::Config, streamer::*};

use utilities::{
    assert_new_click_results, assert_predict_click_results, get_click_blobs, get_request_iter,
};

#[test]
fn test_streamer_new_clicks() {
    let tracker = Config::default().tracker().unwrap();
    let clicks = get_click_blobs(&[(0., 0.), (10., 10.), (-10., 5.)], 1.0, 1000);
    let requests = get_request_iter("new_click", &["home", "about"], clicks);
    let mut result: Vec<String> = vec![];
    let write = |response: String| result.push(response);
    let streamer = Streamer::new(requests, write);
    match Streamer::run(streamer, &tracker) {
        Ok(()) => {
            assert_eq!(1000, result.len());
            assert_new_click_results(&result);
        }
        Err(_) => panic!(),
    };
    assert_eq!(500, tracker.store().history("home").unwrap().len());
    assert_eq!(500, tracker.store().history("about").unwrap().len());
}

#[test]
fn test_streamer_predict_clicks() {
    let tracker = Config::default().tracker().unwrap();
    let clicks = get_click_blobs(&[(0., 0.), (10., 10.)], 1.0, 300);
    let requests = get_request_iter("predict_click", &["home"], clicks);
    let mut result: Vec<String> = vec![];
    let write = |response: String| result.push(response);
    let streamer = Streamer::new(requests, write);
    Streamer::run(streamer, &tracker).unwrap();
    assert_eq!(300, result.len());
    assert_predict_click_results(&result);
    assert!(tracker.store().seen_labels("home").unwrap().is_empty());
}
