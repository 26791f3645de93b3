use super::*;

/// Minimal compute module: `OpEntryPoint GLCompute %main "main"`, local size 1x1x1
fn compute_module() -> Vec<u32> {
    // "main\0" packed into words
    let main = u32::from_le_bytes(*b"main");
    vec![
        0x0723_0203, 0x0001_0000, 0, 6, 0, // header: magic, 1.0, generator, bound, schema
        0x0002_0011, 1, // OpCapability Shader
        0x0003_000E, 0, 1, // OpMemoryModel Logical GLSL450
        0x0005_000F, 5, 1, main, 0, // OpEntryPoint GLCompute %1 "main"
        0x0006_0010, 1, 17, 1, 1, 1, // OpExecutionMode %1 LocalSize 1 1 1
        0x0002_0013, 2, // %2 = OpTypeVoid
        0x0003_0021, 3, 2, // %3 = OpTypeFunction %2
        0x0005_0036, 2, 1, 0, 3, // %1 = OpFunction %2 None %3
        0x0002_00F8, 4, // %4 = OpLabel
        0x0001_00FD, // OpReturn
        0x0001_0038, // OpFunctionEnd
    ]
}

fn to_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

#[test]
fn test_parse_spirv_rejects_empty_and_unaligned() {
    assert!(parse_spirv(&[]).unwrap_err().contains("empty"));
    assert!(parse_spirv(&[1, 2, 3]).unwrap_err().contains("multiple of 4"));
}

#[test]
fn test_parse_spirv_rejects_bad_magic() {
    assert!(parse_spirv(&[0u8; 8]).is_err());
}

#[test]
fn test_parse_spirv_accepts_module() {
    let words = compute_module();
    assert_eq!(parse_spirv(&to_bytes(&words)).unwrap(), words);
}

#[test]
fn test_reflect_finds_entry_point() {
    let mut report = Report::new();
    reflect(&compute_module(), "main", &mut report);
    assert!(!report.has_errors(), "{}", report.text());
}

#[test]
fn test_reflect_reports_missing_entry_point() {
    let mut report = Report::new();
    reflect(&compute_module(), "other", &mut report);
    assert!(report.has_errors());
    assert!(report.text().contains("'other'"));
}
