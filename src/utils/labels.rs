/// Turn a catalog key into a display label
///
/// Underscores become spaces and each run of letters is title-cased, so a
/// letter after any non-letter starts a new word:
/// `"kidney_beans"` → `"Kidney Beans"`, `"PIGEONPEAS"` → `"Pigeonpeas"`,
/// `"pigeon-peas"` → `"Pigeon-Peas"`.
pub fn display_label(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut label = String::with_capacity(spaced.len());
    let mut after_letter = false;

    for word in spaced.split_whitespace() {
        if !label.is_empty() {
            label.push(' ');
            after_letter = false;
        }
        for c in word.chars() {
            if !c.is_alphabetic() {
                label.push(c);
                after_letter = false;
            } else if after_letter {
                label.extend(c.to_lowercase());
            } else {
                label.extend(c.to_uppercase());
                after_letter = true;
            }
        }
    }
    label
}
