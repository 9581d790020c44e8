#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let (res, _) = exifrw::parse_buffer_quiet(data);

    if let Ok(parsed1) = res {
        let serialized1 = parsed1.serialize().expect("in fuzz unwrap 1");
        assert_eq!(serialized1, data, "unmodified image must round trip");

        let (parsed2, _) = exifrw::parse_buffer_quiet(&serialized1);
        let parsed2 = parsed2.expect("in fuzz unwrap 2");
        let serialized2 = parsed2.serialize().expect("in fuzz unwrap 3");

        assert_eq!(serialized1, serialized2);
        assert_eq!(parsed1, parsed2);
    }
});
