//! Recursive-descent parser over the token stream.

use indexmap::IndexMap;

use super::lexer::{Lexer, Spanned, Token};
use super::{ParseError, ParseResult};
use crate::ir::{
    gep_result_type, AtomicOrdering, BasicBlock, BinaryOp, CallTarget, CastOp, CmpPredicate,
    ConstExpr, ConstKind, Constant, FloatKind, Function, GlobalAlias, GlobalIfunc, GlobalVariable,
    InlineAsm, Inst, InstKind, Linkage, Module, ParamAttrs, Parameter, PhiArm, RmwOp, StructDef,
    SwitchArm, SyncScope, Type, UnaryOp, Value,
};

/// Parse textual IR into a module.
pub fn parse(source: &str) -> ParseResult<Module> {
    Parser::new(source)?.parse_module()
}

/// What a module-level symbol refers to, collected in a pre-scan so global
/// references resolve regardless of declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SymbolKind {
    Function,
    Variable,
    Alias,
    Ifunc,
}

const FLOAT_KEYWORDS: &[&str] = &[
    "half", "bfloat", "float", "double", "x86_fp80", "fp128", "ppc_fp128",
];

const FAST_MATH_FLAGS: &[&str] = &[
    "fast", "nnan", "ninf", "nsz", "arcp", "contract", "afn", "reassoc",
];

/// Words that may precede the return type in a function header or call.
const CALL_PREFIX_WORDS: &[&str] = &[
    "ccc", "fastcc", "coldcc", "tailcc", "swiftcc", "swifttailcc", "cfguard_checkcc", "zeroext",
    "signext", "noundef", "nonnull", "inreg", "noalias", "range",
];

/// Parameter attribute words that take no type payload.
const PARAM_FLAG_WORDS: &[&str] = &[
    "noundef", "nonnull", "nocapture", "noalias", "nofree", "nest", "returned", "readonly",
    "readnone", "writeonly", "zeroext", "signext", "inreg", "swiftself", "swifterror", "immarg",
    "captures", "dereferenceable", "dereferenceable_or_null", "align", "range", "dead_on_unwind",
    "writable", "allocalign", "allocptr",
];

/// Function attribute words tolerated after a call or header.
const FN_ATTR_WORDS: &[&str] = &[
    "nounwind", "willreturn", "readnone", "readonly", "writeonly", "argmemonly", "mustprogress",
    "norecurse", "nosync", "nofree", "cold", "hot", "noinline", "alwaysinline", "inlinehint",
    "optsize", "optnone", "minsize", "memory", "speculatable", "convergent", "builtin",
    "nobuiltin", "returns_twice", "noreturn", "ssp", "sspstrong", "sspreq", "uwtable",
    "nocallback", "nomerge", "noduplicate",
];

pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    symbols: IndexMap<String, SymbolKind>,
    structs: IndexMap<String, Option<Vec<Type>>>,
}

impl Parser {
    pub fn new(source: &str) -> ParseResult<Self> {
        let mut tokens = Vec::new();
        for item in Lexer::new(source) {
            match item {
                Ok(spanned) => tokens.push(spanned),
                Err((line, message)) => return Err(ParseError::Lexer { line, message }),
            }
        }
        let symbols = prescan_symbols(&tokens);
        Ok(Self {
            tokens,
            pos: 0,
            symbols,
            structs: IndexMap::new(),
        })
    }

    // ---- token plumbing -------------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, tok)| tok)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|(_, tok)| tok)
    }

    /// Line of the current token (or of the last one at end of input).
    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(line, _)| *line)
            .unwrap_or(0)
    }

    fn next(&mut self) -> ParseResult<Token> {
        let (_, token) = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(ParseError::UnexpectedEof)?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: &Token) -> ParseResult<()> {
        let line = self.line();
        let token = self.next()?;
        if &token == expected {
            Ok(())
        } else {
            Err(ParseError::syntax(
                line,
                format!("expected {:?}, got {:?}", expected, token),
            ))
        }
    }

    fn expect_word(&mut self, word: &str) -> ParseResult<()> {
        let line = self.line();
        match self.next()? {
            Token::Ident(text) if text == word => Ok(()),
            other => Err(ParseError::syntax(
                line,
                format!("expected '{}', got {:?}", word, other),
            )),
        }
    }

    fn accept(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn at_word(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(text)) if text == word)
    }

    fn accept_word(&mut self, word: &str) -> bool {
        if self.at_word(word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn accept_word_of(&mut self, words: &[&str]) -> Option<String> {
        if let Some(Token::Ident(text)) = self.peek() {
            if words.contains(&text.as_str()) {
                let word = text.clone();
                self.pos += 1;
                return Some(word);
            }
        }
        None
    }

    fn expect_int(&mut self) -> ParseResult<i128> {
        let line = self.line();
        match self.next()? {
            Token::Int(value) => Ok(value),
            other => Err(ParseError::syntax(
                line,
                format!("expected integer, got {:?}", other),
            )),
        }
    }

    fn expect_local(&mut self) -> ParseResult<String> {
        let line = self.line();
        match self.next()? {
            Token::LocalIdent(name) => Ok(name),
            other => Err(ParseError::syntax(
                line,
                format!("expected local identifier, got {:?}", other),
            )),
        }
    }

    fn expect_global(&mut self) -> ParseResult<String> {
        let line = self.line();
        match self.next()? {
            Token::GlobalIdent(name) => Ok(name),
            other => Err(ParseError::syntax(
                line,
                format!("expected global identifier, got {:?}", other),
            )),
        }
    }

    fn expect_str(&mut self) -> ParseResult<String> {
        let line = self.line();
        match self.next()? {
            Token::Str(text) => Ok(text),
            other => Err(ParseError::syntax(
                line,
                format!("expected string, got {:?}", other),
            )),
        }
    }

    /// Consume everything remaining on `line`.
    fn skip_line(&mut self, line: usize) {
        while let Some((token_line, _)) = self.tokens.get(self.pos) {
            if *token_line != line {
                break;
            }
            self.pos += 1;
        }
    }

    /// Consume a balanced bracket group whose opener was just consumed.
    fn skip_balanced(&mut self, open: &Token, close: &Token) -> ParseResult<()> {
        let mut depth = 1usize;
        while depth > 0 {
            let token = self.next()?;
            if &token == open {
                depth += 1;
            } else if &token == close {
                depth -= 1;
            }
        }
        Ok(())
    }

    /// Skip an optional parenthesized payload after an attribute word.
    fn skip_optional_parens(&mut self) -> ParseResult<()> {
        if self.accept(&Token::LParen) {
            self.skip_balanced(&Token::LParen, &Token::RParen)?;
        }
        Ok(())
    }

    // ---- module level ---------------------------------------------------

    pub fn parse_module(&mut self) -> ParseResult<Module> {
        let mut module = Module::new("");

        while let Some(token) = self.peek() {
            let line = self.line();
            match token.clone() {
                Token::Ident(word) => match word.as_str() {
                    "source_filename" => {
                        self.pos += 1;
                        self.expect(&Token::Equals)?;
                        let name = self.expect_str()?;
                        module.set_name(name);
                    }
                    "target" => self.skip_line(line),
                    "module" => {
                        self.pos += 1;
                        self.expect_word("asm")?;
                        let blob = self.expect_str()?;
                        module.append_inline_asm(&blob);
                    }
                    "attributes" => {
                        self.pos += 1;
                        self.next()?; // #N
                        self.expect(&Token::Equals)?;
                        self.expect(&Token::LBrace)?;
                        self.skip_balanced(&Token::LBrace, &Token::RBrace)?;
                    }
                    "declare" => {
                        self.pos += 1;
                        let func = self.parse_function(false)?;
                        module.add_function(func);
                    }
                    "define" => {
                        self.pos += 1;
                        let func = self.parse_function(true)?;
                        module.add_function(func);
                    }
                    _ => {
                        log::debug!("skipping top-level construct '{}' at line {}", word, line);
                        self.skip_line(line);
                    }
                },
                Token::LocalIdent(name) => {
                    self.pos += 1;
                    self.expect(&Token::Equals)?;
                    self.expect_word("type")?;
                    let def = self.parse_struct_definition(&name)?;
                    self.structs.insert(def.name.clone(), def.fields.clone());
                    module.register_struct(def);
                }
                Token::GlobalIdent(name) => {
                    self.pos += 1;
                    self.expect(&Token::Equals)?;
                    self.parse_global_definition(&mut module, name, line)?;
                }
                Token::MetadataIdent(_) => self.skip_line(line),
                _ => {
                    log::debug!("skipping unrecognized token at line {}", line);
                    self.skip_line(line);
                }
            }
        }

        Ok(module)
    }

    fn parse_struct_definition(&mut self, name: &str) -> ParseResult<StructDef> {
        if self.accept_word("opaque") {
            return Ok(StructDef::opaque(name));
        }
        let line = self.line();
        let body = self.parse_type()?;
        match body {
            Type::Struct {
                fields: Some(fields),
                ..
            } => Ok(StructDef::new(name, fields)),
            other => Err(ParseError::invalid_type(
                line,
                format!("named type %{} must be a struct, got {}", name, other),
            )),
        }
    }

    fn parse_global_definition(
        &mut self,
        module: &mut Module,
        name: String,
        line: usize,
    ) -> ParseResult<()> {
        let mut linkage = Linkage::External;
        let mut is_thread_local = false;
        let mut is_externally_initialized = false;
        let mut address_space = 0u32;
        let is_const;

        loop {
            let line_here = self.line();
            match self.next()? {
                Token::Ident(word) => match word.as_str() {
                    "global" => {
                        is_const = false;
                        break;
                    }
                    "constant" => {
                        is_const = true;
                        break;
                    }
                    "alias" => {
                        return self.parse_alias_definition(module, name, line);
                    }
                    "ifunc" => {
                        return self.parse_ifunc_definition(module, name, line);
                    }
                    "thread_local" => {
                        is_thread_local = true;
                        self.skip_optional_parens()?;
                    }
                    "externally_initialized" => is_externally_initialized = true,
                    "addrspace" => {
                        self.expect(&Token::LParen)?;
                        address_space = self.expect_int()? as u32;
                        self.expect(&Token::RParen)?;
                    }
                    "unnamed_addr" | "local_unnamed_addr" | "hidden" | "protected"
                    | "default" => {}
                    other => {
                        if let Some(parsed) = Linkage::from_keyword(other) {
                            // `external` and friends carry linkage meaning
                            if other != "dso_local" && other != "dso_preemptable" {
                                linkage = parsed;
                            }
                        } else {
                            return Err(ParseError::syntax(
                                line_here,
                                format!("unexpected word '{}' in global definition", other),
                            ));
                        }
                    }
                },
                other => {
                    return Err(ParseError::syntax(
                        line_here,
                        format!("unexpected token {:?} in global definition", other),
                    ))
                }
            }
        }

        let ty = self.parse_type()?;

        // an initializer follows iff a constant begins on the same line
        let initializer = if self.line() == line && self.starts_constant() {
            Some(self.parse_constant_with_type(ty.clone())?)
        } else {
            None
        };

        let mut global = GlobalVariable::new(name, ty);
        global.linkage = linkage;
        global.is_const = is_const;
        global.is_thread_local = is_thread_local;
        global.is_externally_initialized = is_externally_initialized;
        global.address_space = address_space;
        global.initializer = initializer;
        module.add_global(global);

        // section, alignment, comdat and metadata tails are not modeled
        self.skip_line(line);
        Ok(())
    }

    fn parse_alias_definition(
        &mut self,
        module: &mut Module,
        name: String,
        line: usize,
    ) -> ParseResult<()> {
        let _value_ty = self.parse_type()?;
        self.expect(&Token::Comma)?;
        let aliasee_ty = self.parse_type()?;
        let aliasee = self.parse_constant_with_type(aliasee_ty)?;
        module.add_alias(GlobalAlias { name, aliasee });
        self.skip_line(line);
        Ok(())
    }

    fn parse_ifunc_definition(
        &mut self,
        module: &mut Module,
        name: String,
        line: usize,
    ) -> ParseResult<()> {
        let _value_ty = self.parse_type()?;
        self.expect(&Token::Comma)?;
        let resolver_ty = self.parse_type()?;
        let resolver = self.parse_constant_with_type(resolver_ty)?;
        module.add_ifunc(GlobalIfunc { name, resolver });
        self.skip_line(line);
        Ok(())
    }

    // ---- functions ------------------------------------------------------

    fn parse_function(&mut self, is_definition: bool) -> ParseResult<Function> {
        let header_line = self.line();
        let mut linkage = Linkage::External;

        // linkage, visibility, calling convention, return attributes
        loop {
            if let Some(Token::Ident(word)) = self.peek() {
                let word = word.clone();
                if let Some(parsed) = Linkage::from_keyword(&word) {
                    if word != "dso_local" && word != "dso_preemptable" {
                        linkage = parsed;
                    }
                    self.pos += 1;
                    continue;
                }
                if CALL_PREFIX_WORDS.contains(&word.as_str())
                    || matches!(word.as_str(), "hidden" | "protected" | "default")
                {
                    self.pos += 1;
                    self.skip_optional_parens()?;
                    continue;
                }
                if word == "cc" {
                    self.pos += 1;
                    self.expect_int()?;
                    continue;
                }
            }
            break;
        }

        let ret_ty = self.parse_type()?;
        let name = self.expect_global()?;

        self.expect(&Token::LParen)?;
        let (params, variadic) = self.parse_parameter_list()?;
        self.expect(&Token::RParen)?;

        let mut func = Function::new(name, ret_ty, params);
        func.set_linkage(linkage);
        func.set_variadic(variadic);

        if is_definition {
            // attribute groups, personality and the like sit between the
            // parameter list and the body
            loop {
                match self.peek() {
                    Some(Token::LBrace) => {
                        self.pos += 1;
                        break;
                    }
                    Some(_) => {
                        self.pos += 1;
                    }
                    None => return Err(ParseError::UnexpectedEof),
                }
            }
            self.parse_function_body(&mut func)?;
        } else {
            self.skip_line(header_line);
        }

        Ok(func)
    }

    fn parse_parameter_list(&mut self) -> ParseResult<(Vec<Parameter>, bool)> {
        let mut params = Vec::new();
        let mut variadic = false;

        if self.peek() == Some(&Token::RParen) {
            return Ok((params, variadic));
        }
        loop {
            if self.accept(&Token::Ellipsis) {
                variadic = true;
                break;
            }
            let ty = self.parse_type()?;
            let attrs = self.parse_param_attrs()?;
            let name = match self.peek() {
                Some(Token::LocalIdent(_)) => match self.next()? {
                    Token::LocalIdent(name) => Some(name),
                    _ => unreachable!(),
                },
                _ => None,
            };
            params.push(Parameter { name, ty, attrs });
            if !self.accept(&Token::Comma) {
                break;
            }
        }
        Ok((params, variadic))
    }

    fn parse_param_attrs(&mut self) -> ParseResult<ParamAttrs> {
        let mut attrs = ParamAttrs::default();
        loop {
            let Some(Token::Ident(word)) = self.peek() else {
                break;
            };
            let word = word.clone();
            match word.as_str() {
                "byval" | "byref" | "sret" | "inalloca" | "preallocated" | "elementtype" => {
                    self.pos += 1;
                    self.expect(&Token::LParen)?;
                    let payload = self.parse_type()?;
                    self.expect(&Token::RParen)?;
                    match word.as_str() {
                        "byval" => attrs.by_val = Some(payload),
                        "byref" => attrs.by_ref = Some(payload),
                        "sret" => attrs.struct_ret = Some(payload),
                        "inalloca" => attrs.in_alloca = Some(payload),
                        "preallocated" => attrs.pre_allocated = Some(payload),
                        "elementtype" => attrs.element_type = Some(payload),
                        _ => unreachable!(),
                    }
                }
                "align" => {
                    self.pos += 1;
                    if !self.accept(&Token::LParen) {
                        self.expect_int()?;
                    } else {
                        self.skip_balanced(&Token::LParen, &Token::RParen)?;
                    }
                }
                _ if PARAM_FLAG_WORDS.contains(&word.as_str()) => {
                    self.pos += 1;
                    self.skip_optional_parens()?;
                }
                _ => break,
            }
        }
        Ok(attrs)
    }

    fn parse_function_body(&mut self, func: &mut Function) -> ParseResult<()> {
        let mut current: Option<BasicBlock> = None;
        let mut terminated = false;

        loop {
            let line = self.line();
            match self.peek() {
                Some(Token::RBrace) => {
                    self.pos += 1;
                    if let Some(block) = current.take() {
                        func.add_block(block);
                    }
                    return Ok(());
                }
                Some(Token::Ident(_)) | Some(Token::Int(_))
                    if self.peek_at(1) == Some(&Token::Colon) =>
                {
                    if let Some(block) = current.take() {
                        func.add_block(block);
                    }
                    let label = match self.next()? {
                        Token::Ident(text) => text,
                        Token::Int(value) => value.to_string(),
                        _ => unreachable!(),
                    };
                    self.expect(&Token::Colon)?;
                    current = Some(BasicBlock::new(label));
                    terminated = false;
                }
                Some(_) => {
                    if terminated {
                        return Err(ParseError::syntax(
                            line,
                            "expected block label after terminator",
                        ));
                    }
                    let inst = self.parse_instruction()?;
                    let block = current.get_or_insert_with(BasicBlock::unnamed);
                    if inst.is_terminator() {
                        block.set_terminator(inst);
                        func.add_block(current.take().expect("block in flight"));
                        terminated = true;
                    } else {
                        block.push(inst);
                    }
                }
                None => return Err(ParseError::UnexpectedEof),
            }
        }
    }

    // ---- types ----------------------------------------------------------

    fn starts_type(&self) -> bool {
        match self.peek() {
            Some(Token::IntType(_))
            | Some(Token::LBracket)
            | Some(Token::LBrace)
            | Some(Token::Less)
            | Some(Token::LocalIdent(_)) => true,
            Some(Token::Ident(word)) => {
                FLOAT_KEYWORDS.contains(&word.as_str())
                    || matches!(
                        word.as_str(),
                        "void" | "ptr" | "label" | "token" | "metadata" | "target"
                    )
            }
            _ => false,
        }
    }

    pub fn parse_type(&mut self) -> ParseResult<Type> {
        let line = self.line();
        let mut ty = match self.next()? {
            Token::IntType(width) => Type::int(width),
            Token::Ident(word) => match word.as_str() {
                "void" => Type::Void,
                "ptr" => {
                    if self.accept_word("addrspace") {
                        self.expect(&Token::LParen)?;
                        let space = self.expect_int()? as u32;
                        self.expect(&Token::RParen)?;
                        Type::ptr_in(space)
                    } else {
                        Type::ptr()
                    }
                }
                "label" => Type::Label,
                "token" => Type::Token,
                "metadata" => Type::Metadata,
                "target" => {
                    self.expect(&Token::LParen)?;
                    let name = self.expect_str()?;
                    let mut params = Vec::new();
                    while self.accept(&Token::Comma) {
                        if self.starts_type() {
                            params.push(self.parse_type()?);
                        } else {
                            // integer parameters are not modeled
                            self.next()?;
                        }
                    }
                    self.expect(&Token::RParen)?;
                    Type::Extension { name, params }
                }
                other => {
                    if let Some(kind) = FloatKind::from_keyword(other) {
                        Type::Float(kind)
                    } else {
                        return Err(ParseError::invalid_type(
                            line,
                            format!("unknown type keyword '{}'", other),
                        ));
                    }
                }
            },
            Token::LBracket => {
                let length = self.expect_int()? as u64;
                self.expect_word("x")?;
                let element = self.parse_type()?;
                self.expect(&Token::RBracket)?;
                Type::array(element, length)
            }
            Token::Less => {
                if self.accept(&Token::LBrace) {
                    // packed struct <{ ... }>
                    let fields = self.parse_type_list(&Token::RBrace)?;
                    self.expect(&Token::Greater)?;
                    Type::structure(fields)
                } else if self.accept_word("vscale") {
                    self.expect_word("x")?;
                    let length = self.expect_int()? as u64;
                    self.expect_word("x")?;
                    let element = self.parse_type()?;
                    self.expect(&Token::Greater)?;
                    Type::scalable_vector(element, length)
                } else {
                    let length = self.expect_int()? as u64;
                    self.expect_word("x")?;
                    let element = self.parse_type()?;
                    self.expect(&Token::Greater)?;
                    Type::vector(element, length)
                }
            }
            Token::LBrace => {
                let fields = self.parse_type_list(&Token::RBrace)?;
                Type::structure(fields)
            }
            Token::LocalIdent(name) => match self.structs.get(&name) {
                Some(fields) => Type::Struct {
                    name: Some(name),
                    fields: fields.clone(),
                },
                None => {
                    log::debug!("forward reference to named type %{}, treated as opaque", name);
                    Type::opaque_struct(name)
                }
            },
            other => {
                return Err(ParseError::invalid_type(
                    line,
                    format!("expected type, got {:?}", other),
                ))
            }
        };

        // postfix pointer and function forms
        loop {
            if self.accept(&Token::Star) {
                // legacy typed-pointer syntax collapses to an opaque pointer
                ty = Type::ptr();
            } else if self.at_word("addrspace") && self.peek_at(1) == Some(&Token::LParen) {
                self.pos += 1;
                self.expect(&Token::LParen)?;
                let space = self.expect_int()? as u32;
                self.expect(&Token::RParen)?;
                self.expect(&Token::Star)?;
                ty = Type::ptr_in(space);
            } else if self.peek() == Some(&Token::LParen) {
                self.pos += 1;
                let mut params = Vec::new();
                let mut variadic = false;
                if !self.accept(&Token::RParen) {
                    loop {
                        if self.accept(&Token::Ellipsis) {
                            variadic = true;
                            break;
                        }
                        params.push(self.parse_type()?);
                        if !self.accept(&Token::Comma) {
                            break;
                        }
                    }
                    self.expect(&Token::RParen)?;
                }
                ty = Type::function(params, ty, variadic);
            } else {
                break;
            }
        }
        Ok(ty)
    }

    fn parse_type_list(&mut self, close: &Token) -> ParseResult<Vec<Type>> {
        let mut types = Vec::new();
        if self.accept(close) {
            return Ok(types);
        }
        loop {
            types.push(self.parse_type()?);
            if !self.accept(&Token::Comma) {
                break;
            }
        }
        self.expect(close)?;
        Ok(types)
    }

    // ---- constants and values -------------------------------------------

    /// Whether the current token can begin a constant payload.
    fn starts_constant(&self) -> bool {
        match self.peek() {
            Some(Token::Int(_))
            | Some(Token::Float(_))
            | Some(Token::CStr(_))
            | Some(Token::GlobalIdent(_))
            | Some(Token::LBracket)
            | Some(Token::LBrace)
            | Some(Token::Less) => true,
            Some(Token::Ident(word)) => {
                matches!(
                    word.as_str(),
                    "true"
                        | "false"
                        | "null"
                        | "undef"
                        | "poison"
                        | "zeroinitializer"
                        | "none"
                        | "blockaddress"
                        | "dso_local_equivalent"
                        | "no_cfi"
                        | "getelementptr"
                ) || CastOp::from_keyword(word).is_some()
                    || BinaryOp::from_keyword(word).is_some()
            }
            _ => false,
        }
    }

    fn symbol_constant(&self, ty: Type, name: String) -> Constant {
        let kind = match self.symbols.get(&name) {
            Some(SymbolKind::Function) => ConstKind::Function { name },
            Some(SymbolKind::Alias) => ConstKind::Alias { name },
            Some(SymbolKind::Ifunc) => ConstKind::Ifunc { name },
            Some(SymbolKind::Variable) => ConstKind::Variable { name },
            // unseen symbols default to plain variables
            None => ConstKind::Variable { name },
        };
        Constant::new(ty, kind)
    }

    fn parse_typed_constant(&mut self) -> ParseResult<Constant> {
        let ty = self.parse_type()?;
        self.parse_constant_with_type(ty)
    }

    fn parse_constant_with_type(&mut self, ty: Type) -> ParseResult<Constant> {
        let line = self.line();
        let constant = match self.next()? {
            Token::Int(value) => match &ty {
                Type::Int { width } => Constant::int(*width, value),
                other => {
                    return Err(ParseError::syntax(
                        line,
                        format!("integer literal for non-integer type {}", other),
                    ))
                }
            },
            Token::Float(text) => Constant::float(ty, text),
            Token::CStr(bytes) => {
                let elements = bytes
                    .iter()
                    .map(|byte| Constant::int(8, *byte as i128))
                    .collect();
                Constant::new(ty, ConstKind::Array { elements })
            }
            Token::GlobalIdent(name) => self.symbol_constant(ty, name),
            Token::LBracket => {
                let elements = self.parse_constant_list(&Token::RBracket)?;
                Constant::new(ty, ConstKind::Array { elements })
            }
            Token::LBrace => {
                let elements = self.parse_constant_list(&Token::RBrace)?;
                Constant::new(ty, ConstKind::Struct { elements })
            }
            Token::Less => {
                if self.accept(&Token::LBrace) {
                    let elements = self.parse_constant_list(&Token::RBrace)?;
                    self.expect(&Token::Greater)?;
                    Constant::new(ty, ConstKind::Struct { elements })
                } else {
                    let elements = self.parse_constant_list(&Token::Greater)?;
                    Constant::new(ty, ConstKind::Vector { elements })
                }
            }
            Token::Ident(word) => match word.as_str() {
                "true" => Constant::bool(true),
                "false" => Constant::bool(false),
                "null" => Constant::new(ty, ConstKind::Null),
                "undef" | "poison" => Constant::new(ty, ConstKind::Undef),
                "zeroinitializer" => Constant::new(ty, ConstKind::ZeroAggregate),
                "none" => match &ty {
                    Type::Extension { .. } => Constant::new(ty, ConstKind::ExtensionNone),
                    _ => Constant::new(ty, ConstKind::TokenNone),
                },
                "blockaddress" => {
                    self.expect(&Token::LParen)?;
                    let function = self.expect_global()?;
                    self.expect(&Token::Comma)?;
                    let block = self.expect_local()?;
                    self.expect(&Token::RParen)?;
                    Constant::new(
                        ty,
                        ConstKind::BlockAddress { function, block },
                    )
                }
                "dso_local_equivalent" => {
                    let name = self.expect_global()?;
                    let inner = self.symbol_constant(ty.clone(), name);
                    Constant::new(ty, ConstKind::DsoLocalEquivalent(Box::new(inner)))
                }
                "no_cfi" => {
                    let name = self.expect_global()?;
                    let inner = self.symbol_constant(ty.clone(), name);
                    Constant::new(ty, ConstKind::NoCfi(Box::new(inner)))
                }
                "getelementptr" => {
                    while matches!(self.peek(), Some(Token::Ident(w)) if w == "inbounds" || w == "nuw" || w == "nusw")
                    {
                        self.pos += 1;
                    }
                    self.expect(&Token::LParen)?;
                    let src_pointee_ty = self.parse_type()?;
                    self.expect(&Token::Comma)?;
                    let pointer = self.parse_typed_constant()?;
                    let mut indices = Vec::new();
                    while self.accept(&Token::Comma) {
                        indices.push(self.parse_typed_constant()?);
                    }
                    self.expect(&Token::RParen)?;

                    let steps = indices.iter().skip(1).map(|index| index.as_u64());
                    let dst_pointee_ty =
                        gep_result_type(&src_pointee_ty, steps).ok_or_else(|| {
                            ParseError::syntax(line, "getelementptr indices do not navigate the source type")
                        })?;
                    let address_space = pointer.ty.pointer_address_space().unwrap_or(0);
                    Constant::expr(
                        ty,
                        ConstExpr::GetElementPtr {
                            src_pointee_ty,
                            dst_pointee_ty,
                            pointer,
                            indices,
                            address_space,
                        },
                    )
                }
                other => {
                    if let Some(opcode) = CastOp::from_keyword(other) {
                        self.expect(&Token::LParen)?;
                        let operand = self.parse_typed_constant()?;
                        self.expect_word("to")?;
                        let dst_ty = self.parse_type()?;
                        self.expect(&Token::RParen)?;
                        let src_ty = operand.ty.clone();
                        Constant::expr(
                            ty,
                            ConstExpr::Cast {
                                opcode,
                                src_ty,
                                dst_ty,
                                operand,
                            },
                        )
                    } else if let Some(opcode) = BinaryOp::from_keyword(other) {
                        while matches!(self.peek(), Some(Token::Ident(w)) if w == "nuw" || w == "nsw" || w == "exact")
                        {
                            self.pos += 1;
                        }
                        self.expect(&Token::LParen)?;
                        let lhs = self.parse_typed_constant()?;
                        self.expect(&Token::Comma)?;
                        let rhs = self.parse_typed_constant()?;
                        self.expect(&Token::RParen)?;
                        Constant::expr(ty, ConstExpr::Binary { opcode, lhs, rhs })
                    } else {
                        return Err(ParseError::syntax(
                            line,
                            format!("expected constant, got '{}'", other),
                        ));
                    }
                }
            },
            other => {
                return Err(ParseError::syntax(
                    line,
                    format!("expected constant, got {:?}", other),
                ))
            }
        };
        Ok(constant)
    }

    fn parse_constant_list(&mut self, close: &Token) -> ParseResult<Vec<Constant>> {
        let mut elements = Vec::new();
        if self.accept(close) {
            return Ok(elements);
        }
        loop {
            elements.push(self.parse_typed_constant()?);
            if !self.accept(&Token::Comma) {
                break;
            }
        }
        self.expect(close)?;
        Ok(elements)
    }

    /// Parse a value whose type was already parsed.
    fn parse_value_with_type(&mut self, ty: Type) -> ParseResult<Value> {
        match self.peek() {
            Some(Token::LocalIdent(_)) => {
                let name = self.expect_local()?;
                Ok(Value::Local(name))
            }
            Some(Token::MetadataIdent(_)) => {
                self.skip_metadata_payload()?;
                Ok(Value::Metadata)
            }
            _ if ty == Type::Metadata => {
                // `metadata <ty> <value>` wraps an ordinary value
                if self.starts_type() {
                    let inner = self.parse_type()?;
                    self.parse_value_with_type(inner)?;
                } else {
                    self.next()?;
                }
                Ok(Value::Metadata)
            }
            _ => Ok(Value::Constant(self.parse_constant_with_type(ty)?)),
        }
    }

    fn parse_typed_value(&mut self) -> ParseResult<(Type, Value)> {
        let ty = self.parse_type()?;
        let value = self.parse_value_with_type(ty.clone())?;
        Ok((ty, value))
    }

    fn skip_metadata_payload(&mut self) -> ParseResult<()> {
        // !name, !N or !{ ... }
        self.next()?;
        if self.accept(&Token::LBrace) {
            self.skip_balanced(&Token::LBrace, &Token::RBrace)?;
        }
        Ok(())
    }

    // ---- instructions ---------------------------------------------------

    /// Consume trailing `, align N` / `, !md !N` attachments.
    fn skip_instruction_tail(&mut self) -> ParseResult<()> {
        loop {
            if self.peek() != Some(&Token::Comma) {
                return Ok(());
            }
            match self.peek_at(1) {
                Some(Token::Ident(word)) if word == "align" => {
                    self.pos += 2;
                    self.expect_int()?;
                }
                Some(Token::MetadataIdent(_)) => {
                    self.pos += 1;
                    while matches!(self.peek(), Some(Token::MetadataIdent(_))) {
                        self.skip_metadata_payload()?;
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn skip_fast_math_flags(&mut self) {
        while self.accept_word_of(FAST_MATH_FLAGS).is_some() {}
    }

    fn parse_sync_scope(&mut self) -> ParseResult<SyncScope> {
        if self.accept_word("syncscope") {
            self.expect(&Token::LParen)?;
            let scope = self.expect_str()?;
            self.expect(&Token::RParen)?;
            Ok(match scope.as_str() {
                "" => SyncScope::System,
                "singlethread" => SyncScope::SingleThread,
                _ => SyncScope::Other,
            })
        } else {
            Ok(SyncScope::System)
        }
    }

    fn parse_ordering(&mut self) -> ParseResult<AtomicOrdering> {
        let line = self.line();
        match self.next()? {
            Token::Ident(word) => AtomicOrdering::from_keyword(&word).ok_or_else(|| {
                ParseError::syntax(line, format!("expected atomic ordering, got '{}'", word))
            }),
            other => Err(ParseError::syntax(
                line,
                format!("expected atomic ordering, got {:?}", other),
            )),
        }
    }

    fn parse_label_ref(&mut self) -> ParseResult<String> {
        self.expect_word("label")?;
        self.expect_local()
    }

    fn parse_instruction(&mut self) -> ParseResult<Inst> {
        let line = self.line();
        let name = if matches!(self.peek(), Some(Token::LocalIdent(_)))
            && self.peek_at(1) == Some(&Token::Equals)
        {
            let name = self.expect_local()?;
            self.expect(&Token::Equals)?;
            Some(name)
        } else {
            None
        };

        let opcode = match self.next()? {
            Token::Ident(word) => word,
            other => {
                return Err(ParseError::invalid_instruction(
                    line,
                    format!("expected opcode, got {:?}", other),
                ))
            }
        };

        let mut inst = self.parse_instruction_body(&opcode, line)?;
        inst.name = name;
        self.skip_instruction_tail()?;
        Ok(inst)
    }

    fn parse_instruction_body(&mut self, opcode: &str, line: usize) -> ParseResult<Inst> {
        match opcode {
            // terminators
            "ret" => {
                if self.accept_word("void") {
                    Ok(Inst::new(Type::Void, InstKind::Return { value: None }))
                } else {
                    let (_, value) = self.parse_typed_value()?;
                    Ok(Inst::new(
                        Type::Void,
                        InstKind::Return { value: Some(value) },
                    ))
                }
            }
            "br" => {
                if self.at_word("label") {
                    let target = self.parse_label_ref()?;
                    Ok(Inst::new(
                        Type::Void,
                        InstKind::Branch {
                            cond: None,
                            targets: vec![target],
                        },
                    ))
                } else {
                    let (_, cond) = self.parse_typed_value()?;
                    self.expect(&Token::Comma)?;
                    let then_target = self.parse_label_ref()?;
                    self.expect(&Token::Comma)?;
                    let else_target = self.parse_label_ref()?;
                    Ok(Inst::new(
                        Type::Void,
                        InstKind::Branch {
                            cond: Some(cond),
                            targets: vec![then_target, else_target],
                        },
                    ))
                }
            }
            "switch" => {
                let (cond_ty, cond) = self.parse_typed_value()?;
                self.expect(&Token::Comma)?;
                let default = self.parse_label_ref()?;
                self.expect(&Token::LBracket)?;
                let mut cases = Vec::new();
                while !self.accept(&Token::RBracket) {
                    let value = self.parse_typed_constant()?;
                    self.expect(&Token::Comma)?;
                    let target = self.parse_label_ref()?;
                    cases.push(SwitchArm { value, target });
                }
                Ok(Inst::new(
                    Type::Void,
                    InstKind::Switch {
                        cond_ty,
                        cond,
                        cases,
                        default: Some(default),
                    },
                ))
            }
            "indirectbr" => {
                let (_, address) = self.parse_typed_value()?;
                self.expect(&Token::Comma)?;
                self.expect(&Token::LBracket)?;
                let mut targets = Vec::new();
                while !self.accept(&Token::RBracket) {
                    targets.push(self.parse_label_ref()?);
                    self.accept(&Token::Comma);
                }
                Ok(Inst::new(
                    Type::Void,
                    InstKind::IndirectBranch { address, targets },
                ))
            }
            "unreachable" => Ok(Inst::new(Type::Void, InstKind::Unreachable)),
            "resume" => {
                let (_, value) = self.parse_typed_value()?;
                Ok(Inst::new(Type::Void, InstKind::Resume { value }))
            }

            // memory
            "alloca" => {
                self.accept_word("inalloca");
                let allocated_type = self.parse_type()?;
                let mut size = None;
                let mut address_space = 0u32;
                while self.peek() == Some(&Token::Comma) {
                    match self.peek_at(1) {
                        Some(Token::Ident(word)) if word == "align" => {
                            self.pos += 2;
                            self.expect_int()?;
                        }
                        Some(Token::Ident(word)) if word == "addrspace" => {
                            self.pos += 2;
                            self.expect(&Token::LParen)?;
                            address_space = self.expect_int()? as u32;
                            self.expect(&Token::RParen)?;
                        }
                        _ if matches!(self.peek_at(1), Some(t) if type_starter(t)) => {
                            self.pos += 1;
                            let (_, count) = self.parse_typed_value()?;
                            size = Some(count);
                        }
                        _ => break,
                    }
                }
                Ok(Inst::new(
                    Type::ptr_in(address_space),
                    InstKind::Alloca {
                        allocated_type,
                        size,
                        address_space,
                    },
                ))
            }
            "load" => {
                let atomic = self.accept_word("atomic");
                self.accept_word("volatile");
                let pointee_type = self.parse_type()?;
                self.expect(&Token::Comma)?;
                let (ptr_ty, pointer) = self.parse_typed_value()?;
                let _scope = self.parse_sync_scope()?;
                let ordering = if atomic {
                    self.parse_ordering()?
                } else {
                    AtomicOrdering::NotAtomic
                };
                Ok(Inst::new(
                    pointee_type.clone(),
                    InstKind::Load {
                        pointee_type,
                        pointer,
                        ordering,
                        address_space: ptr_ty.pointer_address_space().unwrap_or(0),
                    },
                ))
            }
            "store" => {
                let atomic = self.accept_word("atomic");
                self.accept_word("volatile");
                let (pointee_type, value) = self.parse_typed_value()?;
                self.expect(&Token::Comma)?;
                let (ptr_ty, pointer) = self.parse_typed_value()?;
                let _scope = self.parse_sync_scope()?;
                let ordering = if atomic {
                    self.parse_ordering()?
                } else {
                    AtomicOrdering::NotAtomic
                };
                Ok(Inst::new(
                    Type::Void,
                    InstKind::Store {
                        pointee_type,
                        pointer,
                        value,
                        ordering,
                        address_space: ptr_ty.pointer_address_space().unwrap_or(0),
                    },
                ))
            }
            "fence" => {
                let scope = self.parse_sync_scope()?;
                let ordering = self.parse_ordering()?;
                Ok(Inst::new(Type::Void, InstKind::Fence { ordering, scope }))
            }
            "cmpxchg" => {
                self.accept_word("weak");
                self.accept_word("volatile");
                let (ptr_ty, pointer) = self.parse_typed_value()?;
                self.expect(&Token::Comma)?;
                let (pointee_type, value_cmp) = self.parse_typed_value()?;
                self.expect(&Token::Comma)?;
                let (_, value_xchg) = self.parse_typed_value()?;
                let scope = self.parse_sync_scope()?;
                let ordering_success = self.parse_ordering()?;
                let ordering_failure = self.parse_ordering()?;
                let result = Type::structure(vec![pointee_type.clone(), Type::int(1)]);
                Ok(Inst::new(
                    result,
                    InstKind::CmpXchg {
                        pointee_type,
                        pointer,
                        value_cmp,
                        value_xchg,
                        address_space: ptr_ty.pointer_address_space().unwrap_or(0),
                        ordering_success,
                        ordering_failure,
                        scope,
                    },
                ))
            }
            "atomicrmw" => {
                self.accept_word("volatile");
                let op_line = self.line();
                let op_word = match self.next()? {
                    Token::Ident(word) => word,
                    other => {
                        return Err(ParseError::invalid_instruction(
                            op_line,
                            format!("expected atomicrmw operation, got {:?}", other),
                        ))
                    }
                };
                let rmw_op = RmwOp::from_keyword(&op_word).ok_or_else(|| {
                    ParseError::invalid_instruction(
                        op_line,
                        format!("unknown atomicrmw operation '{}'", op_word),
                    )
                })?;
                let (ptr_ty, pointer) = self.parse_typed_value()?;
                self.expect(&Token::Comma)?;
                let (pointee_type, value) = self.parse_typed_value()?;
                let scope = self.parse_sync_scope()?;
                let ordering = self.parse_ordering()?;
                Ok(Inst::new(
                    pointee_type.clone(),
                    InstKind::AtomicRmw {
                        opcode: rmw_op,
                        pointee_type,
                        pointer,
                        value,
                        address_space: ptr_ty.pointer_address_space().unwrap_or(0),
                        ordering,
                        scope,
                    },
                ))
            }
            "getelementptr" => {
                while self.accept_word("inbounds")
                    || self.accept_word("nuw")
                    || self.accept_word("nusw")
                {}
                let src_pointee_ty = self.parse_type()?;
                self.expect(&Token::Comma)?;
                let (ptr_ty, pointer) = self.parse_typed_value()?;
                let mut indices = Vec::new();
                let mut index_hints = Vec::new();
                while self.peek() == Some(&Token::Comma)
                    && matches!(self.peek_at(1), Some(t) if type_starter(t))
                {
                    self.pos += 1;
                    let (_, index) = self.parse_typed_value()?;
                    index_hints.push(match &index {
                        Value::Constant(constant) => constant.as_u64(),
                        _ => None,
                    });
                    indices.push(index);
                }
                let dst_pointee_ty =
                    gep_result_type(&src_pointee_ty, index_hints.into_iter().skip(1))
                        .ok_or_else(|| {
                            ParseError::invalid_instruction(
                                line,
                                "getelementptr indices do not navigate the source type",
                            )
                        })?;
                let address_space = ptr_ty.pointer_address_space().unwrap_or(0);
                Ok(Inst::new(
                    Type::ptr_in(address_space),
                    InstKind::Gep {
                        src_pointee_ty,
                        dst_pointee_ty,
                        pointer,
                        indices,
                        address_space,
                    },
                ))
            }
            "va_arg" => {
                let (_, pointer) = self.parse_typed_value()?;
                self.expect(&Token::Comma)?;
                let result = self.parse_type()?;
                Ok(Inst::new(result, InstKind::VAArg { pointer }))
            }

            // arithmetic, comparison, casts
            "fneg" => {
                self.skip_fast_math_flags();
                let (ty, operand) = self.parse_typed_value()?;
                Ok(Inst::new(
                    ty,
                    InstKind::Unary {
                        opcode: UnaryOp::FNeg,
                        operand,
                    },
                ))
            }
            "icmp" | "fcmp" => {
                self.skip_fast_math_flags();
                let pred_line = self.line();
                let pred_word = match self.next()? {
                    Token::Ident(word) => word,
                    other => {
                        return Err(ParseError::invalid_instruction(
                            pred_line,
                            format!("expected predicate, got {:?}", other),
                        ))
                    }
                };
                let predicate = if opcode == "icmp" {
                    CmpPredicate::from_int_keyword(&pred_word)
                } else {
                    CmpPredicate::from_float_keyword(&pred_word)
                }
                .ok_or_else(|| {
                    ParseError::invalid_instruction(
                        pred_line,
                        format!("unknown {} predicate '{}'", opcode, pred_word),
                    )
                })?;
                let (operand_type, lhs) = self.parse_typed_value()?;
                self.expect(&Token::Comma)?;
                let rhs = self.parse_value_with_type(operand_type.clone())?;
                let result = match &operand_type {
                    Type::Vector {
                        element: _,
                        fixed,
                        length,
                    } => Type::Vector {
                        element: Box::new(Type::int(1)),
                        fixed: *fixed,
                        length: *length,
                    },
                    _ => Type::int(1),
                };
                Ok(Inst::new(
                    result,
                    InstKind::Compare {
                        predicate,
                        operand_type,
                        lhs,
                        rhs,
                    },
                ))
            }
            "select" => {
                self.skip_fast_math_flags();
                let (_, cond) = self.parse_typed_value()?;
                self.expect(&Token::Comma)?;
                let (value_ty, then_value) = self.parse_typed_value()?;
                self.expect(&Token::Comma)?;
                let (_, else_value) = self.parse_typed_value()?;
                Ok(Inst::new(
                    value_ty,
                    InstKind::Select {
                        cond,
                        then_value,
                        else_value,
                    },
                ))
            }
            "freeze" => {
                let (ty, operand) = self.parse_typed_value()?;
                Ok(Inst::new(ty, InstKind::Freeze { operand }))
            }
            "phi" => {
                self.skip_fast_math_flags();
                let ty = self.parse_type()?;
                let mut options = Vec::new();
                loop {
                    self.expect(&Token::LBracket)?;
                    let value = self.parse_value_with_type(ty.clone())?;
                    self.expect(&Token::Comma)?;
                    let block = self.expect_local()?;
                    self.expect(&Token::RBracket)?;
                    options.push(PhiArm { block, value });
                    if !(self.peek() == Some(&Token::Comma)
                        && self.peek_at(1) == Some(&Token::LBracket))
                    {
                        break;
                    }
                    self.pos += 1;
                }
                Ok(Inst::new(ty, InstKind::Phi { options }))
            }

            // aggregates
            "extractvalue" => {
                let (from_ty, aggregate) = self.parse_typed_value()?;
                let mut indices = Vec::new();
                while self.peek() == Some(&Token::Comma)
                    && matches!(self.peek_at(1), Some(Token::Int(_)))
                {
                    self.pos += 1;
                    indices.push(self.expect_int()? as u32);
                }
                let result = gep_result_type(
                    &from_ty,
                    indices.iter().map(|index| Some(*index as u64)),
                )
                .ok_or_else(|| {
                    ParseError::invalid_instruction(
                        line,
                        "extractvalue indices do not navigate the aggregate",
                    )
                })?;
                Ok(Inst::new(
                    result,
                    InstKind::ExtractValue {
                        from_ty,
                        aggregate,
                        indices,
                    },
                ))
            }
            "insertvalue" => {
                let (agg_ty, aggregate) = self.parse_typed_value()?;
                self.expect(&Token::Comma)?;
                let (_, value) = self.parse_typed_value()?;
                let mut indices = Vec::new();
                while self.peek() == Some(&Token::Comma)
                    && matches!(self.peek_at(1), Some(Token::Int(_)))
                {
                    self.pos += 1;
                    indices.push(self.expect_int()? as u32);
                }
                Ok(Inst::new(
                    agg_ty,
                    InstKind::InsertValue {
                        aggregate,
                        value,
                        indices,
                    },
                ))
            }
            "extractelement" => {
                let (vec_ty, vector) = self.parse_typed_value()?;
                self.expect(&Token::Comma)?;
                let (_, slot) = self.parse_typed_value()?;
                let result = match &vec_ty {
                    Type::Vector { element, .. } => (**element).clone(),
                    other => {
                        return Err(ParseError::invalid_instruction(
                            line,
                            format!("extractelement from non-vector {}", other),
                        ))
                    }
                };
                Ok(Inst::new(
                    result,
                    InstKind::ExtractElement {
                        vec_ty,
                        vector,
                        slot,
                    },
                ))
            }
            "insertelement" => {
                let (vec_ty, vector) = self.parse_typed_value()?;
                self.expect(&Token::Comma)?;
                let (_, value) = self.parse_typed_value()?;
                self.expect(&Token::Comma)?;
                let (_, slot) = self.parse_typed_value()?;
                Ok(Inst::new(
                    vec_ty,
                    InstKind::InsertElement {
                        vector,
                        value,
                        slot,
                    },
                ))
            }
            "shufflevector" => {
                let (vec_ty, lhs) = self.parse_typed_value()?;
                self.expect(&Token::Comma)?;
                let (_, rhs) = self.parse_typed_value()?;
                self.expect(&Token::Comma)?;
                let mask_const = self.parse_typed_constant()?;
                let mask = shuffle_mask(&mask_const).ok_or_else(|| {
                    ParseError::invalid_instruction(line, "invalid shufflevector mask")
                })?;
                let element = match &vec_ty {
                    Type::Vector { element, .. } => (**element).clone(),
                    other => {
                        return Err(ParseError::invalid_instruction(
                            line,
                            format!("shufflevector on non-vector {}", other),
                        ))
                    }
                };
                let result = Type::vector(element, mask.len() as u64);
                Ok(Inst::new(
                    result,
                    InstKind::ShuffleVector { lhs, rhs, mask },
                ))
            }

            // exception handling
            "landingpad" => {
                let ty = self.parse_type()?;
                let mut clauses = Vec::new();
                let mut is_cleanup = false;
                loop {
                    if self.accept_word("cleanup") {
                        is_cleanup = true;
                    } else if self.accept_word("catch") || self.accept_word("filter") {
                        clauses.push(self.parse_typed_constant()?);
                    } else {
                        break;
                    }
                }
                Ok(Inst::new(
                    ty,
                    InstKind::LandingPad {
                        clauses,
                        is_cleanup,
                    },
                ))
            }

            // call family
            "tail" | "musttail" | "notail" => {
                self.expect_word("call")?;
                self.parse_call_like(false, line)
            }
            "call" => self.parse_call_like(false, line),
            "invoke" => self.parse_call_like(true, line),

            other => {
                if let Some(binary) = BinaryOp::from_keyword(other) {
                    while self.accept_word("nuw")
                        || self.accept_word("nsw")
                        || self.accept_word("exact")
                        || self.accept_word("disjoint")
                        || self.accept_word_of(FAST_MATH_FLAGS).is_some()
                    {}
                    let (ty, lhs) = self.parse_typed_value()?;
                    self.expect(&Token::Comma)?;
                    let rhs = self.parse_value_with_type(ty.clone())?;
                    return Ok(Inst::new(
                        ty,
                        InstKind::Binary {
                            opcode: binary,
                            lhs,
                            rhs,
                        },
                    ));
                }
                if let Some(cast) = CastOp::from_keyword(other) {
                    while self.accept_word("nuw") || self.accept_word("nsw") {}
                    let (src_ty, operand) = self.parse_typed_value()?;
                    self.expect_word("to")?;
                    let dst_ty = self.parse_type()?;
                    return Ok(Inst::new(
                        dst_ty.clone(),
                        InstKind::Cast {
                            opcode: cast,
                            src_ty,
                            dst_ty,
                            operand,
                        },
                    ));
                }
                Err(ParseError::invalid_instruction(
                    line,
                    format!("unknown opcode '{}'", other),
                ))
            }
        }
    }

    /// Shared call/invoke parsing.
    fn parse_call_like(&mut self, is_invoke: bool, line: usize) -> ParseResult<Inst> {
        self.skip_fast_math_flags();
        while self.accept_word_of(CALL_PREFIX_WORDS).is_some() {
            self.skip_optional_parens()?;
        }
        if self.accept_word("cc") {
            self.expect_int()?;
        }

        let ret_or_sig = self.parse_type()?;
        let explicit_sig = matches!(ret_or_sig, Type::Function { .. });

        let target = match self.peek() {
            Some(Token::Ident(word)) if word == "asm" => {
                self.pos += 1;
                while self.accept_word("sideeffect")
                    || self.accept_word("alignstack")
                    || self.accept_word("inteldialect")
                    || self.accept_word("unwind")
                {}
                let text = self.expect_str()?;
                self.expect(&Token::Comma)?;
                let constraint = self.expect_str()?;
                // the signature is attached after the arguments are known
                CallTarget::Asm(InlineAsm::new(Type::Void, text, constraint))
            }
            Some(Token::GlobalIdent(_)) => {
                let symbol = self.expect_global()?;
                CallTarget::Value(Value::Constant(self.symbol_constant(Type::ptr(), symbol)))
            }
            Some(Token::LocalIdent(_)) => CallTarget::Value(Value::Local(self.expect_local()?)),
            other => {
                return Err(ParseError::invalid_instruction(
                    line,
                    format!("expected callee, got {:?}", other),
                ))
            }
        };

        self.expect(&Token::LParen)?;
        let mut arg_types = Vec::new();
        let mut args = Vec::new();
        if !self.accept(&Token::RParen) {
            loop {
                let ty = self.parse_type()?;
                self.parse_param_attrs()?;
                let value = self.parse_value_with_type(ty.clone())?;
                arg_types.push(ty);
                args.push(value);
                if !self.accept(&Token::Comma) {
                    break;
                }
            }
            self.expect(&Token::RParen)?;
        }

        // trailing attribute groups and keywords
        loop {
            match self.peek() {
                Some(Token::AttrRef(_)) => {
                    self.pos += 1;
                }
                Some(Token::Ident(word)) if FN_ATTR_WORDS.contains(&word.as_str()) => {
                    self.pos += 1;
                    self.skip_optional_parens()?;
                }
                _ => break,
            }
        }

        let signature = if explicit_sig {
            ret_or_sig
        } else {
            Type::function(arg_types, ret_or_sig, false)
        };
        let ret_ty = match &signature {
            Type::Function { ret, .. } => (**ret).clone(),
            _ => Type::Void,
        };
        let target = match target {
            CallTarget::Asm(mut asm) => {
                asm.signature = signature.clone();
                CallTarget::Asm(asm)
            }
            other => other,
        };

        if is_invoke {
            self.expect_word("to")?;
            let normal = self.parse_label_ref()?;
            self.expect_word("unwind")?;
            let unwind = self.parse_label_ref()?;
            Ok(Inst::new(
                ret_ty,
                InstKind::Invoke {
                    target,
                    signature,
                    args,
                    normal,
                    unwind,
                },
            ))
        } else {
            Ok(Inst::new(
                ret_ty,
                InstKind::Call {
                    target,
                    signature,
                    args,
                },
            ))
        }
    }
}

/// Whether a token can begin a type (free-function form for lookahead).
fn type_starter(token: &Token) -> bool {
    match token {
        Token::IntType(_)
        | Token::LBracket
        | Token::LBrace
        | Token::Less
        | Token::LocalIdent(_) => true,
        Token::Ident(word) => {
            FLOAT_KEYWORDS.contains(&word.as_str())
                || matches!(
                    word.as_str(),
                    "void" | "ptr" | "label" | "token" | "metadata" | "target"
                )
        }
        _ => false,
    }
}

/// Extract a shuffle mask from its constant form.
fn shuffle_mask(mask: &Constant) -> Option<Vec<i32>> {
    match &mask.kind {
        ConstKind::Vector { elements } => elements
            .iter()
            .map(|element| match &element.kind {
                ConstKind::Int { value } => value.parse::<i32>().ok(),
                ConstKind::Undef => Some(-1),
                _ => None,
            })
            .collect(),
        ConstKind::ZeroAggregate => match &mask.ty {
            Type::Vector { length, .. } => Some(vec![0; *length as usize]),
            _ => None,
        },
        _ => None,
    }
}

/// Collect the kind of every module-level symbol before the real parse, so
/// references resolve independent of declaration order.
fn prescan_symbols(tokens: &[Spanned]) -> IndexMap<String, SymbolKind> {
    let mut symbols = IndexMap::new();
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i].1 {
            Token::Ident(word) if word == "define" || word == "declare" => {
                let mut j = i + 1;
                while j < tokens.len() {
                    if let Token::GlobalIdent(name) = &tokens[j].1 {
                        symbols.insert(name.clone(), SymbolKind::Function);
                        break;
                    }
                    j += 1;
                }
                i = j + 1;
            }
            Token::GlobalIdent(name)
                if matches!(tokens.get(i + 1), Some((_, Token::Equals))) =>
            {
                let line = tokens[i].0;
                let mut kind = SymbolKind::Variable;
                let mut j = i + 2;
                while j < tokens.len() && tokens[j].0 == line {
                    if let Token::Ident(word) = &tokens[j].1 {
                        match word.as_str() {
                            "alias" => {
                                kind = SymbolKind::Alias;
                                break;
                            }
                            "ifunc" => {
                                kind = SymbolKind::Ifunc;
                                break;
                            }
                            "global" | "constant" => break,
                            _ => {}
                        }
                    }
                    j += 1;
                }
                symbols.insert(name.clone(), kind);
                i += 1;
            }
            _ => i += 1,
        }
    }
    symbols
}
