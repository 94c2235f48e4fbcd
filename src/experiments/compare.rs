use super::results::VariantResult;

fn print_metrics(title: &str, result: &VariantResult) {
    println!("{}:", title);
    println!("  Forget Accuracy: {:.4}", result.forget_acc);
    println!("  Utility Accuracy: {:.4}", result.utility_acc);
    println!("  Forget F1: {:.4}", result.forget_f1);
    println!("  Utility F1: {:.4}", result.utility_f1);
    println!("  Time Taken: {:.2}s", result.time_taken);
}

/// Pick the better of the two variants by forget accuracy.
///
/// A missing side loses automatically. When both are present, the full
/// comparison is printed and a tie goes to `first`.
pub fn compare_results<'a>(
    first: Option<&'a VariantResult>,
    second: Option<&'a VariantResult>,
) -> Option<&'a VariantResult> {
    let (first, second) = match (first, second) {
        (None, None) => {
            println!("No results available for comparison");
            return None;
        }
        (Some(only), None) | (None, Some(only)) => return Some(only),
        (Some(first), Some(second)) => (first, second),
    };

    println!("\n{}", "=".repeat(60));
    println!("RESULTS COMPARISON");
    println!("{}", "=".repeat(60));
    print_metrics(first.variant.description(), first);
    println!();
    print_metrics(second.variant.description(), second);

    println!("\nForget scores (higher is better for unlearning):");
    println!("  {}: {:.4}", first.variant, first.forget_acc);
    println!("  {}: {:.4}", second.variant, second.forget_acc);

    let best = if first.forget_acc >= second.forget_acc {
        first
    } else {
        second
    };
    println!("\nBest variant: {}", best.variant.description());
    println!("   Best Forget Score: {:.4}", best.forget_acc);

    Some(best)
}
