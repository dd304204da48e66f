use super::*;

fn line_points() -> Vec<f32> {
    // 1-d points at 0, 1, 3, 7
    vec![0.0, 1.0, 3.0, 7.0]
}

#[test]
fn within_excludes_self_and_sorts() {
    let nn = knn_within(&line_points(), 1, 2);
    assert_eq!(nn.k, 2);
    assert_eq!(nn.n_points(), 4);
    assert_eq!(nn.of(0), &[1, 2]);
    assert_eq!(nn.of(2), &[1, 0]);
    assert_eq!(nn.of(3), &[2, 1]);
    assert_eq!(nn.distances_of(3), &[4.0, 6.0]);
}

#[test]
fn within_caps_k() {
    let nn = knn_within(&line_points(), 1, 10);
    assert_eq!(nn.k, 3);
    assert_eq!(nn.of(1), &[0, 2, 3]);
}

#[test]
fn ties_break_by_index() {
    let pts = vec![0.0, 0.0, 1.0, 0.0, -1.0, 0.0];
    let nn = knn_within(&pts, 2, 1);
    assert_eq!(nn.of(0), &[1]);
}

#[test]
fn between_sets() {
    let base = vec![0.0, 10.0, 20.0];
    let queries = vec![9.0, 19.0];
    let nn = knn_between(&queries, &base, 1, 2);
    assert_eq!(nn.of(0), &[1, 0]);
    assert_eq!(nn.of(1), &[2, 1]);
    assert_eq!(nn.distances_of(1), &[1.0, 9.0]);
}
