pub mod aggregate;
pub mod summarize;
pub mod validate;

use reweight_core::FieldSpec;

/// Assemble the field schema from the repeated CLI flags, preserving the
/// categorical/numeric/timestamp grouping.
pub fn field_specs(
    categorical: &[String],
    numeric: &[String],
    timestamp: &[String],
) -> Vec<FieldSpec> {
    let mut fields = Vec::new();
    for name in categorical {
        fields.push(FieldSpec::categorical(name));
    }
    for name in numeric {
        fields.push(FieldSpec::numeric(name));
    }
    for name in timestamp {
        fields.push(FieldSpec::timestamp(name));
    }
    fields
}

/// Fatal configuration error: report and abort before any processing.
pub fn fatal(message: &str) -> ! {
    eprintln!("Error: {message}");
    std::process::exit(1);
}

/// Fatal I/O error wrapper for paths that must be readable/writable.
pub fn fatal_io(context: &str, err: std::io::Error) -> ! {
    eprintln!("Error: {context}: {err}");
    std::process::exit(1);
}
