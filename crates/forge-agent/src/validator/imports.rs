//! Import extraction for the dependency-allowlist rule.

use regex::Regex;
use std::sync::LazyLock;

/// Statement shapes that pull in a module, each capturing the specifier.
static IMPORT_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // import X from 'pkg' / import { a, b } from 'pkg' / import type T from 'pkg'
        r#"\bimport\s+(?:type\s+)?(?:/\*(?s:.*?)\*/|//[^\n]*|[^;'"/])*?\bfrom\s*['"]([^'"]+)['"]"#,
        // import 'pkg'
        r#"\bimport\s*['"]([^'"]+)['"]"#,
        // import('pkg')
        r#"\bimport\s*\(\s*['"]([^'"]+)['"]\s*\)"#,
        // require('pkg')
        r#"\brequire\s*\(\s*['"]([^'"]+)['"]\s*\)"#,
        // export { a } from 'pkg' / export * from 'pkg'
        r#"\bexport\s+(?:type\s+)?(?:/\*(?s:.*?)\*/|//[^\n]*|[^;'"/])*?\bfrom\s*['"]([^'"]+)['"]"#,
    ]
    .into_iter()
    .map(|pattern| match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(err) => panic!("Import regex is invalid: {err}"),
    })
    .collect()
});

/// Specifier prefixes that point inside the project rather than at a package.
const LOCAL_PREFIXES: [&str; 5] = ["./", "../", "/", "@/", "~/"];

/// Package name of an import specifier, or `None` for local imports.
///
/// `lodash/debounce` reduces to `lodash`; scoped names keep two segments, so
/// `@radix-ui/react-dialog/dist` reduces to `@radix-ui/react-dialog`.
pub fn package_name(specifier: &str) -> Option<&str> {
    let specifier = specifier.trim();
    if specifier.is_empty()
        || specifier == "."
        || specifier == ".."
        || LOCAL_PREFIXES
            .iter()
            .any(|prefix| specifier.starts_with(prefix))
    {
        return None;
    }

    let segments = if specifier.starts_with('@') { 2 } else { 1 };
    let end = specifier
        .match_indices('/')
        .nth(segments - 1)
        .map_or(specifier.len(), |(index, _)| index);
    Some(&specifier[..end])
}

/// Distinct external packages imported by `code`, in order of first appearance.
pub fn imported_packages(code: &str) -> Vec<String> {
    let mut found: Vec<(usize, &str)> = IMPORT_REGEXES
        .iter()
        .flat_map(|regex| regex.captures_iter(code))
        .filter_map(|captures| {
            let specifier = captures.get(1)?;
            Some((specifier.start(), package_name(specifier.as_str())?))
        })
        .collect();
    found.sort_by_key(|(offset, _)| *offset);

    let mut packages: Vec<String> = Vec::new();
    for (_, name) in found {
        if !packages.iter().any(|known| known == name) {
            packages.push(name.to_owned());
        }
    }
    packages
}

/// Imported packages missing from `allowlist`, in order of first appearance.
pub fn disallowed_imports(code: &str, allowlist: &[String]) -> Vec<String> {
    imported_packages(code)
        .into_iter()
        .filter(|package| !allowlist.contains(package))
        .collect()
}
