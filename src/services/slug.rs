//! URL slugs for blog posts and career postings

use std::future::Future;

use anyhow::Result;

/// Used when a title has no sluggable characters at all
const FALLBACK_SLUG: &str = "item";

/// Give up probing suffixes after this many collisions
const MAX_SUFFIX: u32 = 10_000;

/// Lower-case, hyphen-separated ASCII slug.
///
/// Accented Latin-1 letters are transliterated; any other
/// non-alphanumeric run becomes a single hyphen.
pub fn slugify(s: &str) -> String {
    let transliterated: String = s
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' | 'ã' | 'å' | 'Á' | 'À' | 'Ä' | 'Â' | 'Ã' | 'Å' => 'a',
            'ç' | 'Ç' => 'c',
            'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'i',
            'ñ' | 'Ñ' => 'n',
            'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' | 'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' | 'Ø' => 'o',
            'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'u',
            'ý' | 'ÿ' | 'Ý' => 'y',
            other => other,
        })
        .collect();

    let mut slug = String::with_capacity(transliterated.len());
    let mut pending_hyphen = false;
    for c in transliterated.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else if c == '\'' || c == '’' {
            // apostrophes vanish: "Ali's" -> "alis"
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// First free slug among `base`, `base-1`, `base-2`, ...
///
/// `exists` reports whether a candidate is already taken.
pub async fn unique_slug<F, Fut>(base: &str, mut exists: F) -> Result<String>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    if !exists(base.to_string()).await? {
        return Ok(base.to_string());
    }

    for n in 1..=MAX_SUFFIX {
        let candidate = format!("{}-{}", base, n);
        if !exists(candidate.clone()).await? {
            return Ok(candidate);
        }
    }

    anyhow::bail!("No free slug for '{}' after {} attempts", base, MAX_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_slugify_basic_title() {
        assert_eq!(slugify("Choosing Exterior Paint"), "choosing-exterior-paint");
    }

    #[test]
    fn test_slugify_collapses_punctuation_runs() {
        assert_eq!(slugify("  Colours -- & Finishes!! 2024 "), "colours-finishes-2024");
    }

    #[test]
    fn test_slugify_transliterates_accents() {
        assert_eq!(slugify("Café Crème"), "cafe-creme");
        assert_eq!(slugify("Façade Colours: Crème Brûlée"), "facade-colours-creme-brulee");
    }

    #[test]
    fn test_slugify_drops_apostrophes() {
        assert_eq!(slugify("Painter's Guide"), "painters-guide");
    }

    #[test]
    fn test_slugify_empty_falls_back() {
        assert_eq!(slugify("!!!"), "item");
        assert_eq!(slugify(""), "item");
    }

    #[tokio::test]
    async fn test_unique_slug_free_base() {
        let slug = unique_slug("new-post", |_| async { Ok(false) }).await.unwrap();
        assert_eq!(slug, "new-post");
    }

    #[tokio::test]
    async fn test_unique_slug_appends_counter() {
        let taken: HashSet<String> = ["paint", "paint-1", "paint-2"].iter().map(|s| s.to_string()).collect();
        let slug = unique_slug("paint", |candidate| {
            let hit = taken.contains(&candidate);
            async move { Ok(hit) }
        })
        .await
        .unwrap();
        assert_eq!(slug, "paint-3");
    }

    #[tokio::test]
    async fn test_unique_slug_propagates_lookup_errors() {
        let result = unique_slug("paint", |_| async { Err(anyhow::anyhow!("db down")) }).await;
        assert!(result.is_err());
    }
}
