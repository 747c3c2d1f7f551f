use std::collections::BTreeMap;

use crate::{
    errors::{Result, UserFacingError},
    model::{FetchContext, Resource, VariableProvider},
    utils::{TemplatePart, has_shell_metacharacters, referenced_placeholders, split_template},
};

/// Values available for substitution on command templates
pub type Variables = BTreeMap<String, String>;

/// Collects the variables for a resource: `ID`, `NAME`, `ARN`, `PROFILE`, `REGION` and any value exposed by the kind.
///
/// Built-in names take precedence over kind-specific ones.
pub fn resource_variables(
    resource: &Resource,
    ctx: &FetchContext,
    provider: Option<&dyn VariableProvider>,
) -> Variables {
    let mut vars = provider.map(|p| p.variables(resource)).unwrap_or_default();
    vars.insert(String::from("ID"), resource.id().to_owned());
    vars.insert(String::from("NAME"), resource.name().to_owned());
    vars.insert(String::from("ARN"), resource.arn().to_owned());
    vars.insert(String::from("PROFILE"), ctx.profile.clone());
    vars.insert(String::from("REGION"), ctx.region.clone());
    vars
}

/// Replaces the placeholders of a template that will be handed to an external process.
///
/// Every referenced value is checked for shell metacharacters before anything is replaced, failing closed with
/// [`UserFacingError::UnsafeValue`]. Unknown placeholders are a configuration error.
pub fn substitute(action: &str, template: &str, vars: &Variables) -> Result<String> {
    check_referenced(action, template, vars)?;
    Ok(replace(template, vars))
}

/// Tokenizes a command template by whitespace and substitutes each token, so values with spaces remain a single
/// argument.
///
/// The same checks as [`substitute`] apply to the whole template.
pub fn substitute_args(action: &str, template: &str, vars: &Variables) -> Result<Vec<String>> {
    check_referenced(action, template, vars)?;
    Ok(template.split_whitespace().map(|token| replace(token, vars)).collect())
}

/// Replaces the placeholders of a template that is never executed, like a navigation filter value.
///
/// Unknown placeholders are still a configuration error, but values are not checked for metacharacters.
pub fn substitute_value(action: &str, template: &str, vars: &Variables) -> Result<String> {
    for name in referenced_placeholders(template) {
        if !vars.contains_key(name) {
            return Err(unknown_placeholder(action, name));
        }
    }
    Ok(replace(template, vars))
}

fn check_referenced(action: &str, template: &str, vars: &Variables) -> Result<()> {
    for name in referenced_placeholders(template) {
        let value = vars.get(name).ok_or_else(|| unknown_placeholder(action, name))?;
        if has_shell_metacharacters(value) {
            tracing::warn!("Refusing to substitute ${{{name}}} for action {action}: unsafe value");
            return Err(UserFacingError::UnsafeValue {
                placeholder: name.to_owned(),
            }
            .into());
        }
    }
    Ok(())
}

fn replace(template: &str, vars: &Variables) -> String {
    split_template(template)
        .into_iter()
        .map(|part| match part {
            TemplatePart::Text(text) => text,
            TemplatePart::Placeholder(name) => vars.get(name).map(String::as_str).unwrap_or_default(),
        })
        .collect()
}

fn unknown_placeholder(action: &str, name: &str) -> crate::errors::AppError {
    UserFacingError::ActionMisconfigured {
        action: action.to_owned(),
        reason: format!("unknown placeholder ${{{name}}}"),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::errors::AppError;

    struct Logs;
    impl VariableProvider for Logs {
        fn variables(&self, resource: &Resource) -> BTreeMap<String, String> {
            BTreeMap::from([
                (String::from("LOG_GROUP"), format!("/aws/lambda/{}", resource.name())),
                (String::from("ID"), String::from("shadowed")),
            ])
        }
    }

    fn vars(name: &str) -> Variables {
        let resource = Resource::new("i-0abc").with_name(name).with_arn("arn:aws:ec2:eu-west-1:1:instance/i-0abc");
        resource_variables(&resource, &FetchContext::new("dev", "eu-west-1"), Some(&Logs))
    }

    #[test]
    fn test_resource_variables() {
        let vars = vars("web");
        assert_eq!(vars["ID"], "i-0abc");
        assert_eq!(vars["NAME"], "web");
        assert_eq!(vars["PROFILE"], "dev");
        assert_eq!(vars["REGION"], "eu-west-1");
        assert_eq!(vars["LOG_GROUP"], "/aws/lambda/web");
    }

    #[test]
    fn test_substitute() {
        let cmd = substitute("logs", "aws logs tail ${LOG_GROUP} --profile ${PROFILE}", &vars("web")).unwrap();
        assert_eq!(cmd, "aws logs tail /aws/lambda/web --profile dev");
    }

    #[test]
    fn test_unsafe_value_fails_closed() {
        let res = substitute("echo", "echo ${NAME}", &vars("evil; rm -rf /"));
        assert!(matches!(
            res,
            Err(AppError::UserFacing(UserFacingError::UnsafeValue { placeholder })) if placeholder == "NAME"
        ));
    }

    #[test]
    fn test_unreferenced_unsafe_value_is_ignored() {
        let cmd = substitute("echo", "echo ${ID}", &vars("evil; rm -rf /")).unwrap();
        assert_eq!(cmd, "echo i-0abc");
    }

    #[test]
    fn test_unknown_placeholder() {
        let res = substitute("ssh", "ssh ${PRIVATE_IP}", &vars("web"));
        assert!(matches!(
            res,
            Err(AppError::UserFacing(UserFacingError::ActionMisconfigured { .. }))
        ));
    }

    #[test]
    fn test_substitute_args_keeps_values_whole() {
        let args = substitute_args("describe", "aws ec2 describe --name ${NAME}", &vars("my web server")).unwrap();
        assert_eq!(args, vec!["aws", "ec2", "describe", "--name", "my web server"]);
    }

    #[test]
    fn test_substitute_value_skips_metacharacter_check() {
        let value = substitute_value("nav", "${NAME}", &vars("a|b")).unwrap();
        assert_eq!(value, "a|b");
        assert!(substitute_value("nav", "${VPC}", &vars("a")).is_err());
    }
}
