use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread;

use ndarray::array;

use crate::replay_buffer::{ReplayBuffer, Transition};

fn tagged(tag: usize) -> Transition<usize> {
    Transition::new(array![tag as f64], tag % 3, tag as f64, array![(tag + 1) as f64], false)
}

#[test]
fn test_replay_buffer_add_and_sample() {
    let buffer = ReplayBuffer::new(10).unwrap();
    let transition = Transition::new(array![0.5, -0.5], 0usize, 1.0, array![0.6, -0.4], false);
    buffer.add(transition.clone());
    assert_eq!(buffer.len(), 1);
    let sample = buffer.sample(1);
    assert_eq!(sample, vec![transition]);
}

#[test]
fn test_zero_capacity_rejected() {
    assert!(ReplayBuffer::<usize>::new(0).is_err());
}

#[test]
fn test_oldest_entries_are_overwritten() {
    let capacity = 8;
    let buffer = ReplayBuffer::new(capacity).unwrap();
    for tag in 0..capacity + 5 {
        buffer.add(tagged(tag));
    }

    assert_eq!(buffer.len(), capacity);
    let surviving: Vec<usize> = buffer.contents().iter().map(|t| t.state[0] as usize).collect();
    let expected: Vec<usize> = (5..capacity + 5).collect();
    assert_eq!(surviving, expected);
}

#[test]
fn test_sample_size_and_membership() {
    let buffer = ReplayBuffer::with_seed(10, 3).unwrap();
    for tag in 0..15 {
        buffer.add(tagged(tag));
    }

    let current: HashSet<Transition<usize>> = buffer.contents().into_iter().collect();
    for k in [1, 4, 10] {
        let batch = buffer.sample(k);
        assert_eq!(batch.len(), k);
        assert!(batch.iter().all(|t| current.contains(t)));
    }
}

#[test]
fn test_sample_is_best_effort_when_underfull() {
    let buffer = ReplayBuffer::new(10).unwrap();
    assert!(buffer.sample(4).is_empty());

    buffer.add(tagged(0));
    buffer.add(tagged(1));
    assert_eq!(buffer.sample(32).len(), 2);
}

#[test]
fn test_sampling_covers_uniformly() {
    let buffer = ReplayBuffer::with_seed(10, 11).unwrap();
    for tag in 0..10 {
        buffer.add(tagged(tag));
    }

    let mut counts: HashMap<usize, usize> = HashMap::new();
    let draws = 20_000;
    for _ in 0..draws / 10 {
        for t in buffer.sample(10) {
            *counts.entry(t.state[0] as usize).or_default() += 1;
        }
    }

    assert_eq!(counts.len(), 10);
    let expected = draws as f64 / 10.0;
    for (&tag, &count) in &counts {
        let deviation = (count as f64 - expected).abs() / expected;
        assert!(deviation < 0.1, "tag {} drawn {} times", tag, count);
    }
}

#[test]
fn test_average_reward_and_clear() {
    let buffer = ReplayBuffer::new(4).unwrap();
    assert_eq!(buffer.average_reward(), 0.0);
    for tag in 1..=4 {
        buffer.add(tagged(tag));
    }
    assert_eq!(buffer.average_reward(), 2.5);

    buffer.clear();
    assert!(buffer.is_empty());
    assert_eq!(buffer.capacity(), 4);
    assert!(buffer.sample(2).is_empty());

    buffer.add(tagged(9));
    assert_eq!(buffer.contents(), vec![tagged(9)]);
}

#[test]
fn test_transition_equality_is_by_value() {
    let a = tagged(4);
    let b = tagged(4);
    assert_eq!(a, b);
    assert_ne!(a, tagged(5));

    let nan = Transition::new(array![f64::NAN], 0usize, 0.0, array![0.0], true);
    assert_eq!(nan, nan.clone());

    let set: HashSet<_> = vec![a, b, nan.clone(), nan].into_iter().collect();
    assert_eq!(set.len(), 2);
}

#[test]
fn test_concurrent_add_and_sample() {
    let buffer = Arc::new(ReplayBuffer::new(64).unwrap());
    let mut handles = Vec::new();
    for worker in 0..4 {
        let buffer = Arc::clone(&buffer);
        handles.push(thread::spawn(move || {
            for i in 0..100 {
                buffer.add(tagged(worker * 1000 + i));
                let _ = buffer.sample(8);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(buffer.len(), 64);
}
