#![no_main]

use libfuzzer_sys::fuzz_target;
use zinspect::{Destination, InflateConfig, Inflater, NullReporter};

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as a raw DEFLATE stream: errors are fine, panics are not
    let inflater = Inflater::default();
    let measured = inflater.measure(data);
    let real = inflater.inflate_to_vec(data);

    // Measuring and decoding must agree on success, size and consumption
    match (&measured, &real) {
        (Ok(m), Ok((out, r))) => {
            assert_eq!(m, r);
            assert_eq!(out.len(), r.produced);
        }
        (Err(m), Err(r)) => assert_eq!(m.error, r.error),
        _ => panic!("measure {:?} disagrees with decode {:?}", measured, real.as_ref().map(|(_, r)| r)),
    }

    // A slice of exactly the measured size is enough
    if let Ok(m) = measured {
        let mut buf = vec![0u8; m.produced];
        let done = inflater
            .inflate(data, Destination::Slice(&mut buf), &mut NullReporter, None)
            .expect("exact-size slice decode");
        assert_eq!(done, m);
    }

    // Leniency only changes the outcome of distance-too-far failures
    let lenient = Inflater::new(InflateConfig { allow_distance_too_far: true }).measure(data);
    if let Ok(m) = measured {
        assert_eq!(lenient, Ok(m));
    }
});
