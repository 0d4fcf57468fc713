// src/db/push_id.rs
use rand::Rng;
use std::cell::RefCell;

/// Key alphabet in ASCII order, so keys sort the same way as strings and as times.
const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

thread_local! {
    static LAST: RefCell<(i64, [u8; 12])> = const { RefCell::new((0, [0u8; 12])) };
}

/// Generate a 20-char, chronologically sortable child key.
///
/// 8 chars of millisecond timestamp followed by 12 random chars. Two keys
/// generated in the same millisecond on one thread increment the random part,
/// so they still sort in creation order.
pub fn generate_push_id(now_millis: i64) -> String {
    let mut rng = rand::thread_rng();

    let random = LAST.with(|cell| {
        let mut last = cell.borrow_mut();
        if now_millis == last.0 {
            increment(&mut last.1);
        } else {
            for slot in last.1.iter_mut() {
                *slot = rng.gen_range(0..64);
            }
            last.0 = now_millis;
        }
        last.1
    });

    let mut ts = now_millis.max(0);
    let mut head = [0u8; 8];
    for slot in head.iter_mut().rev() {
        *slot = PUSH_CHARS[(ts % 64) as usize];
        ts /= 64;
    }

    let mut id = String::with_capacity(20);
    id.extend(head.iter().map(|&c| c as char));
    id.extend(random.iter().map(|&i| PUSH_CHARS[i as usize] as char));
    id
}

fn increment(digits: &mut [u8; 12]) {
    for d in digits.iter_mut().rev() {
        if *d == 63 {
            *d = 0;
        } else {
            *d += 1;
            return;
        }
    }
}
