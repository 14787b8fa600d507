#![no_main]
use libfuzzer_sys::fuzz_target;

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt};
use ckms_stream::ckms::{Quantile, CKMS};
use ckms_stream::Config;

fuzz_target!(|data: &[u8]| {
    let mut cursor = Cursor::new(data);

    // unbounded, construction rejects what falls outside (0, 1)
    let (quantile, error) = match (
        cursor.read_f64::<BigEndian>(),
        cursor.read_f64::<BigEndian>(),
    ) {
        (Ok(q), Ok(e)) => (q, e),
        _ => return,
    };
    let quantile = match Quantile::new(quantile, error) {
        Ok(q) => q,
        Err(_) => return,
    };
    // bounded 2**12
    let capacity = match cursor.read_u16::<BigEndian>() {
        Ok(c) => usize::from(c % 4096) + 1,
        Err(_) => return,
    };

    let config = Config::default()
        .with_buffer_capacity(capacity)
        .with_quantiles(&[quantile]);
    let mut ckms = CKMS::<u32>::with_config(&config).unwrap();
    let mut inserted = 0;
    while let Ok(v) = cursor.read_u32::<BigEndian>() {
        ckms.insert(v);
        inserted += 1;
    }

    let answer = ckms.query(quantile.quantile());
    assert_eq!(inserted, ckms.count());
    assert_eq!(inserted == 0, answer.is_none());
});
