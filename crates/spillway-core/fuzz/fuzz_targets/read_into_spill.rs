#![no_main]

use libfuzzer_sys::fuzz_target;
use spillway_core::{
    AddressSpace, CorruptionReporter, FieldKind, RawReadChannel, SimError, TypedRegionView,
};

fuzz_target!(|data: &[u8]| {
    if data.len() < 6 {
        return;
    }

    let region_count = usize::from(data[0] % 6) + 1;
    let Some(capacities) = data.get(1..=region_count) else {
        return;
    };
    let mut space = AddressSpace::default();
    let mut view = TypedRegionView::new();
    for (index, capacity) in capacities.iter().enumerate() {
        let capacity = usize::from(*capacity % 64) + 1;
        let handle = space
            .register_region(format!("r{index}"), capacity)
            .expect("unique names and non-zero capacities");
        if capacity >= 4 {
            let _ = view.declare_field(&space, handle, "word", 0, 4, FieldKind::Signed);
        }
    }

    let rest = &data[region_count + 1..];
    let Some((&selector, input)) = rest.split_first() else {
        return;
    };
    let destination = space
        .handles()
        .nth(usize::from(selector) % region_count)
        .expect("selector is reduced modulo region count");
    let requested = usize::from(selector) * 2;
    let base = space.region(destination).expect("own handle").base;

    let reporter = CorruptionReporter::new();
    let before = reporter.snapshot(&space, &view).expect("own view");
    let mut source = input;
    match RawReadChannel::new().read_into(&mut space, destination, requested, &mut source) {
        Ok(op) => {
            assert!(op.written() <= requested);
            assert_eq!(op.written(), requested.min(input.len()));
            assert_eq!(op.spans().iter().map(|span| span.len).sum::<usize>(), op.written());
        }
        Err(SimError::AddressSpaceExhausted { available, .. }) => {
            assert!(requested > available);
            assert_eq!(available, space.end() - base);
        }
        Err(other) => panic!("unexpected error: {other}"),
    }
    let after = reporter.snapshot(&space, &view).expect("own view");
    let _ = reporter.diff(&before, &after);
});
