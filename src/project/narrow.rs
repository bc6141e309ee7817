//! Disambiguation of directories that hold more than one logical unit.

use tracing::debug;

use super::error::ProjectError;
use super::resolver::DirectoryScan;
use super::unit::{CompilationUnit, base_unit_name, is_external_test_name};

/// Narrow a directory scan down to the unit that `file_name` belongs to.
///
/// For an external-test file the result is the external-test variant and
/// holds only files declaring exactly that name. For any other file the
/// result keeps the primary and in-unit test files of the file's base unit
/// and drops external-test files. Unrelated units sharing the directory,
/// such as a second `main`, are never merged in.
pub fn narrow_to_file(scan: &DirectoryScan, file_name: &str) -> Result<CompilationUnit, ProjectError> {
    let unit = &scan.unit;
    let declared = scan
        .file_units
        .get(file_name)
        .ok_or_else(|| ProjectError::AmbiguousFileNotFound {
            import_path: unit.import_path.clone(),
            dir: unit.dir.clone(),
            file: file_name.to_string(),
        })?;

    let declaring = |files: &[String], accept: &dyn Fn(&str) -> bool| -> Vec<String> {
        files
            .iter()
            .filter(|f| scan.file_units.get(f.as_str()).is_some_and(|n| accept(n)))
            .cloned()
            .collect()
    };

    let narrowed = if is_external_test_name(declared) {
        let exact = |n: &str| n == declared.as_str();
        let mut narrowed = CompilationUnit::new(unit.import_path.clone(), unit.dir.clone(), declared.clone())
            .with_primary_files(declaring(&unit.primary_files, &exact))
            .with_test_files(declaring(&unit.test_files, &exact))
            .with_external_test_files(declaring(&unit.external_test_files, &exact));
        narrowed.is_test_variant = true;
        narrowed
    } else {
        let base = base_unit_name(declared);
        let same_base = |n: &str| base_unit_name(n) == base;
        CompilationUnit::new(unit.import_path.clone(), unit.dir.clone(), base)
            .with_primary_files(declaring(&unit.primary_files, &same_base))
            .with_test_files(declaring(&unit.test_files, &same_base))
    };

    debug!(
        import_path = %unit.import_path,
        file = file_name,
        unit = %narrowed.name,
        test_variant = narrowed.is_test_variant,
        "narrowed multi-unit directory"
    );
    Ok(narrowed)
}
