//! Synthetic GPMF buffers for integration tests
#![allow(dead_code)]

/// One KLV record, padded to 4 bytes
pub fn klv(label: &[u8; 4], type_tag: u8, size: u8, repeat: u16, payload: &[u8]) -> Vec<u8> {
    assert_eq!(payload.len(), size as usize * repeat as usize);
    let mut out = Vec::with_capacity(8 + payload.len() + 3);
    out.extend_from_slice(label);
    out.push(type_tag);
    out.push(size);
    out.extend_from_slice(&repeat.to_be_bytes());
    out.extend_from_slice(payload);
    while out.len() % 4 != 0 {
        out.push(0);
    }
    out
}

/// Container record wrapping already-encoded children
pub fn container(label: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
    let body: Vec<u8> = children.concat();
    let mut out = Vec::with_capacity(8 + body.len());
    out.extend_from_slice(label);
    out.push(0);
    out.push(4);
    out.extend_from_slice(&((body.len() / 4) as u16).to_be_bytes());
    out.extend_from_slice(&body);
    out
}

pub fn device_name(name: &str) -> Vec<u8> {
    klv(b"DVNM", b'c', 1, name.len() as u16, name.as_bytes())
}

pub fn gpsu(anchor: &str) -> Vec<u8> {
    klv(b"GPSU", b'U', 16, 1, anchor.as_bytes())
}

pub fn gpsf(fix: u32) -> Vec<u8> {
    klv(b"GPSF", b'L', 4, 1, &fix.to_be_bytes())
}

pub fn gpsp(dop: u16) -> Vec<u8> {
    klv(b"GPSP", b'S', 2, 1, &dop.to_be_bytes())
}

pub fn tmpc(celsius: f32) -> Vec<u8> {
    klv(b"TMPC", b'f', 4, 1, &celsius.to_be_bytes())
}

pub fn scal(values: &[i32]) -> Vec<u8> {
    let payload: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
    klv(b"SCAL", b'l', 4, values.len() as u16, &payload)
}

pub fn gps5(samples: &[[i32; 5]]) -> Vec<u8> {
    let payload: Vec<u8> = samples
        .iter()
        .flat_map(|s| s.iter().flat_map(|v| v.to_be_bytes()))
        .collect();
    klv(b"GPS5", b'l', 20, samples.len() as u16, &payload)
}

/// GoPro-style scale: degrees x1e7, metres x1000, speeds x1000 / x100
pub const GOPRO_SCALE: [i32; 5] = [10_000_000, 10_000_000, 1000, 1000, 100];

/// Raw GPS5 sample in GoPro units
pub fn sample(lat: f64, lon: f64, alt: f64, speed: f64) -> [i32; 5] {
    [
        (lat * 1e7).round() as i32,
        (lon * 1e7).round() as i32,
        (alt * 1000.0).round() as i32,
        (speed * 1000.0).round() as i32,
        (speed * 100.0).round() as i32,
    ]
}

/// One second of telemetry the way a camera lays it out
pub fn gps_payload(name: &str, anchor: &str, fix: u32, dop: u16, samples: &[[i32; 5]]) -> Vec<u8> {
    container(
        b"DEVC",
        &[
            device_name(name),
            container(
                b"STRM",
                &[
                    klv(b"STNM", b'c', 1, 3, b"GPS"),
                    gpsf(fix),
                    gpsu(anchor),
                    gpsp(dop),
                    scal(&GOPRO_SCALE),
                    gps5(samples),
                ],
            ),
        ],
    )
}
