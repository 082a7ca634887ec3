//! The context builder stays within `max_tokens`, and `adaptive_budget`
//! only widens the cap once total demand exceeds `2 * max_tokens`.

use codex_vfs::context::{BuildOptions, ContextBuilder};
use codex_vfs::vfs::Vfs;

const TOKENS_PER_ENTRY_BYTES: usize = 4000; // token_estimate = len / 4 = 1000

#[test]
fn e6_build_stays_within_budget() {
    let mut vfs = Vfs::new();
    for name in ["a", "b", "c"] {
        vfs.write(&format!("/{name}.txt"), "x".repeat(TOKENS_PER_ENTRY_BYTES).into_bytes(), 0).unwrap();
    }
    let mut builder = ContextBuilder::new(&vfs, 2500);
    builder.collect_from_path("/");

    let plain = builder.build();
    assert_eq!(plain.matches("=== ").count(), 2);

    let (_, details) = builder.build_with_options(&BuildOptions { adaptive_budget: true, ..Default::default() });
    assert_eq!(details.matches("=== ").count(), 2, "demand 3000 <= 2*2500, budget must not widen");
}

#[test]
fn e6_adaptive_budget_widens_past_double_demand() {
    let mut vfs = Vfs::new();
    for name in ["a", "b", "c", "d", "e", "f"] {
        vfs.write(&format!("/{name}.txt"), "x".repeat(TOKENS_PER_ENTRY_BYTES).into_bytes(), 0).unwrap();
    }
    let mut builder = ContextBuilder::new(&vfs, 2500);
    builder.collect_from_path("/");

    let (_, plain_details) = builder.build_with_options(&BuildOptions::default());
    assert_eq!(plain_details.matches("=== ").count(), 2, "non-adaptive stays at the plain budget");

    let (_, adaptive_details) =
        builder.build_with_options(&BuildOptions { adaptive_budget: true, ..Default::default() });
    assert_eq!(adaptive_details.matches("=== ").count(), 5, "demand 6000 > 2*2500 widens the budget to 5000");
}
